// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Environment bootstrap (spec §4.1).
//!
//! Reads the two flags the shell sets before `exec`-ing a pipeline tool:
//! whether this tool's standard input and standard output are sgsh-active,
//! i.e. wired to another sgsh tool for the duration of negotiation.

use crate::error::NegotiationError;

/// Name of the environment variable carrying the "stdin is sgsh-active" flag.
pub const SGSH_IN: &str = "SGSH_IN";
/// Name of the environment variable carrying the "stdout is sgsh-active" flag.
pub const SGSH_OUT: &str = "SGSH_OUT";

/// The sgsh-activity of this tool's two standard channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SgshActivity {
    pub sgsh_in: bool,
    pub sgsh_out: bool,
}

fn read_bool_var(name: &str) -> Result<bool, NegotiationError> {
    let raw = std::env::var(name).map_err(|_| {
        NegotiationError::Environment(format!("environment variable {name} is not set"))
    })?;
    match raw.trim().parse::<u32>() {
        Ok(0) => Ok(false),
        Ok(_) => Ok(true),
        Err(_) => Err(NegotiationError::Environment(format!(
            "environment variable {name} has non-numeric value {raw:?}"
        ))),
    }
}

/// Reads [`SGSH_IN`] and [`SGSH_OUT`]. Failure to parse either is fatal, the
/// tool never enters the negotiation loop.
pub fn bootstrap() -> Result<SgshActivity, NegotiationError> {
    let sgsh_in = read_bool_var(SGSH_IN)?;
    let sgsh_out = read_bool_var(SGSH_OUT)?;
    tracing::debug!(sgsh_in, sgsh_out, "environment bootstrap complete");
    Ok(SgshActivity { sgsh_in, sgsh_out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn parses_decimal_booleans() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(SGSH_IN, "1");
        std::env::set_var(SGSH_OUT, "0");
        let activity = bootstrap().unwrap();
        assert!(activity.sgsh_in);
        assert!(!activity.sgsh_out);
        std::env::remove_var(SGSH_IN);
        std::env::remove_var(SGSH_OUT);
    }

    #[test]
    fn missing_variable_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(SGSH_IN);
        std::env::remove_var(SGSH_OUT);
        assert!(matches!(
            bootstrap(),
            Err(NegotiationError::Environment(_))
        ));
    }

    #[test]
    fn non_numeric_value_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(SGSH_IN, "yes");
        std::env::set_var(SGSH_OUT, "0");
        assert!(matches!(
            bootstrap(),
            Err(NegotiationError::Environment(_))
        ));
        std::env::remove_var(SGSH_IN);
        std::env::remove_var(SGSH_OUT);
    }
}
