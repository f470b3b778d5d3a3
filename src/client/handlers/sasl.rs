//! SASL authentication, run when the `sasl` capability is acknowledged.

use std::time::Duration;

use tracing::{info, warn};

use crate::caps::Cap;
use crate::client::Client;
use crate::error::{ConfigError, Result};
use crate::sasl::{
    chunk_response, encode_external, encode_plain_with_authzid, parse_mechanisms, SaslMechanism,
    SaslState, SASL_RESULT_NUMERICS,
};

const CHALLENGE_TIMEOUT: Duration = Duration::from_secs(5);
const RESULT_TIMEOUT: Duration = Duration::from_secs(30);

pub(super) async fn authenticate(client: Client, cap: Cap) -> Result<()> {
    let Some(mechanism) = client.config().sasl_mechanism.clone() else {
        return Ok(());
    };

    if let Some(offered) = cap.value.as_deref() {
        if !parse_mechanisms(offered).contains(&mechanism) {
            warn!(%mechanism, offered, "server does not offer the configured sasl mechanism");
            return Ok(());
        }
    }

    let challenge = client.waiter(&["AUTHENTICATE"]);
    client.send(format!("AUTHENTICATE {}", mechanism));
    set_state(&client, SaslState::MechanismSent(mechanism.clone()))?;

    let Some(reply) = challenge.wait(Some(CHALLENGE_TIMEOUT)).await else {
        warn!(%mechanism, "no AUTHENTICATE challenge from server");
        return set_state(&client, SaslState::Failed("timeout".to_owned()));
    };
    if reply.param(0) != Some("+") {
        warn!(%mechanism, challenge = ?reply.param(0), "unexpected AUTHENTICATE challenge");
        return set_state(&client, SaslState::Failed("unexpected challenge".to_owned()));
    }

    let payload = match &mechanism {
        SaslMechanism::Plain => {
            let credentials = client
                .config()
                .sasl_credentials
                .as_ref()
                .ok_or(ConfigError::MissingSaslCredentials)?;
            let account = &credentials.username;
            encode_plain_with_authzid(account, account, &credentials.password)
        }
        SaslMechanism::External => encode_external(None),
        other => return Err(ConfigError::UnsupportedSaslMechanism(other.to_string()).into()),
    };

    let result = client.waiter(&SASL_RESULT_NUMERICS);
    for chunk in chunk_response(&payload) {
        client.send(format!("AUTHENTICATE {}", chunk));
    }
    set_state(&client, SaslState::CredentialsSent)?;

    let state = match result.wait(Some(RESULT_TIMEOUT)).await {
        Some(reply) => {
            let text = reply.params().last().map(String::as_str);
            SaslState::from_numeric(reply.command(), text)
        }
        None => SaslState::Failed("timeout".to_owned()),
    };
    if state.is_success() {
        info!(%mechanism, "sasl authentication succeeded");
    } else {
        warn!(%mechanism, ?state, "sasl authentication failed");
    }
    set_state(&client, state)
}

fn set_state(client: &Client, state: SaslState) -> Result<()> {
    client.with_session(|session| session.sasl = state)
}
