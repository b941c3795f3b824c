// src/cli/handlers/commons.rs

// Argument parsing shared by the builtin handlers.

use crate::{cli::dispatcher::BuiltinError, core::job_table::JobTable, models::Job};

/// Parses a `%<jid>` argument.
pub fn parse_job_id(command: &str, token: Option<&str>) -> Result<usize, BuiltinError> {
    let token = token.ok_or_else(|| BuiltinError::MissingJobId {
        command: command.to_string(),
    })?;
    token
        .strip_prefix('%')
        .and_then(|digits| digits.parse::<usize>().ok())
        .filter(|jid| *jid > 0)
        .ok_or_else(|| BuiltinError::MalformedJobId {
            command: command.to_string(),
            token: token.to_string(),
        })
}

/// Resolves a `%<jid>` argument to a live job.
pub fn resolve_job<'a>(
    command: &str,
    token: Option<&str>,
    table: &'a JobTable,
) -> Result<&'a Job, BuiltinError> {
    let jid = parse_job_id(command, token)?;
    table.find_by_jid(jid).ok_or(BuiltinError::JobNotFound {
        command: command.to_string(),
        jid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;
    use nix::unistd::Pid;

    #[test]
    fn test_parse_job_id() {
        assert_eq!(parse_job_id("fg", Some("%3")).unwrap(), 3);
        assert!(matches!(
            parse_job_id("fg", None),
            Err(BuiltinError::MissingJobId { .. })
        ));
        for bad in ["3", "%", "%x", "%0", "%-1"] {
            assert!(
                matches!(
                    parse_job_id("bg", Some(bad)),
                    Err(BuiltinError::MalformedJobId { .. })
                ),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_resolve_job_requires_live_slot() {
        let mut table = JobTable::new(2);
        table
            .insert(Pid::from_raw(4242), JobState::Background, "sleep 5")
            .unwrap();
        assert_eq!(resolve_job("bg", Some("%1"), &table).unwrap().pid.as_raw(), 4242);
        assert!(matches!(
            resolve_job("bg", Some("%2"), &table),
            Err(BuiltinError::JobNotFound { jid: 2, .. })
        ));
    }
}
