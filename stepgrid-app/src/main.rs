fn main() -> anyhow::Result<()> {
    env_logger::init();
    stepgrid_app::run_app()
}
