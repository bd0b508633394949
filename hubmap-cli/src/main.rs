fn main() -> anyhow::Result<()> {
    hubmap_cli::entrypoint()
}
