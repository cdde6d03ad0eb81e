use anyhow::Result;

fn main() -> Result<()> {
    gatehouse_observability::init();

    let config = gatehouse_infra::Config::from_env()?;
    let access = gatehouse_app::build(&config)?;

    let status = gatehouse_app::status(&access);
    tracing::info!(
        data_dir = %config.data_dir.display(),
        users = status.users,
        groups = status.groups,
        setup_required = status.setup_required,
        "access control ready"
    );
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
