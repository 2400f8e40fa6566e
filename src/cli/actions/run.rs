use crate::cli::actions::{server, Action};
use anyhow::Result;
use tracing::{debug, error};

/// Execute the provided action, logging a failure before handing it back.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let name = action.name();
    debug!(action = name, "executing");

    let result = match action {
        Action::Server(args) => server::execute(args).await,
    };

    if let Err(err) = &result {
        error!(action = name, "{err:#}");
    }
    result
}
