use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::{Instant, sleep};

use crate::{error, info, success, warning};

const LOGIN_WAIT: Duration = Duration::from_secs(120);
const LOGIN_POLL: Duration = Duration::from_secs(2);

/// Opens the Spotify login of the backend in the default browser.
///
/// With a `state` the backend stores the tokens under that user id, so the
/// command can wait until the account shows up as authenticated.
pub async fn login(state: Option<String>) {
    let backend = super::backend();
    let url = backend.login_url(state.as_deref());

    info!("Opening Spotify login in your browser...");
    if webbrowser::open(&url).is_err() {
        warning!("Could not open a browser. Visit {} to log in", url);
    }

    let Some(user_id) = state else {
        info!("Login started. Pass --state to wait for it to finish.");
        return;
    };

    let pb = ProgressBar::new_spinner();
    pb.set_message("Waiting for Spotify authorization...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let deadline = Instant::now() + LOGIN_WAIT;
    while Instant::now() < deadline {
        match backend.auth_status(&user_id).await {
            Ok(status) if status.authenticated => {
                pb.finish_and_clear();
                success!("Spotify account linked to user '{}'", user_id);
                return;
            }
            Ok(_) => {}
            Err(e) => pb.set_message(format!("Waiting for Spotify authorization... ({})", e)),
        }
        sleep(LOGIN_POLL).await;
    }

    pb.finish_and_clear();
    error!("Login was not completed within {} seconds", LOGIN_WAIT.as_secs());
}

pub async fn status(user_id: String) {
    match super::backend().auth_status(&user_id).await {
        Ok(status) if status.authenticated => success!("{}", status.message),
        Ok(status) => warning!("{}. Run folio login --state {}", status.message, user_id),
        Err(e) => error!("Cannot reach the backend. Err: {}", e),
    }
}
