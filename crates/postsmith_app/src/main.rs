mod logging;
mod persistence;
mod runtime;

fn main() -> anyhow::Result<()> {
    logging::initialize(logging::LogDestination::Both);

    let base_url = std::env::var("POSTSMITH_API_URL")
        .unwrap_or_else(|_| "http://localhost:8000/api".to_string());
    let owner_id =
        std::env::var("POSTSMITH_OWNER_ID").unwrap_or_else(|_| "local-user".to_string());
    let state_dir = std::env::current_dir()?.join(".postsmith");

    runtime::run(base_url, owner_id, state_dir)
}
