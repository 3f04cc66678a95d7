//! Command deny-list: coarse prefix matching for shell commands.
//!
//! This is a safety net, not a sandbox: a command is refused only when its
//! trimmed text starts with a configured prefix. Anything more elaborate
//! (pipes, subshells, aliases) is not inspected.

/// Result of checking a command against the deny-list.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandCheck {
    /// Command may run
    Allowed,
    /// Command starts with a forbidden prefix
    Denied { prefix: String },
}

/// A list of forbidden command prefixes.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    prefixes: Vec<String>,
}

impl DenyList {
    /// Build a deny-list. Blank entries are ignored.
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Check a command.
    ///
    /// Rules:
    /// - the command is trimmed before matching
    /// - an empty deny-list allows everything
    /// - matching is case-sensitive, on the prefix only
    pub fn check(&self, command: &str) -> CommandCheck {
        let trimmed = command.trim();
        match self.prefixes.iter().find(|p| trimmed.starts_with(p.as_str())) {
            Some(prefix) => CommandCheck::Denied {
                prefix: prefix.clone(),
            },
            None => CommandCheck::Allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied(deny: &DenyList, command: &str) -> bool {
        matches!(deny.check(command), CommandCheck::Denied { .. })
    }

    fn list() -> DenyList {
        DenyList::new(vec!["sudo".into(), "rm -rf /".into()])
    }

    #[test]
    fn prefix_denied_regardless_of_arguments() {
        let deny = list();
        for cmd in ["sudo", "sudo ls", "sudo rm -rf ~", "   sudo apt install x"] {
            assert_eq!(
                deny.check(cmd),
                CommandCheck::Denied {
                    prefix: "sudo".into()
                },
                "{cmd}"
            );
        }
    }

    #[test]
    fn non_prefix_occurrence_allowed() {
        let deny = list();
        assert_eq!(deny.check("echo sudo"), CommandCheck::Allowed);
        assert_eq!(deny.check("ls -la"), CommandCheck::Allowed);
    }

    #[test]
    fn empty_list_allows_all() {
        let deny = DenyList::new(Vec::<String>::new());
        assert!(!denied(&deny, "anything goes"));
    }

    #[test]
    fn blank_entries_ignored() {
        let deny = DenyList::new(vec!["".into(), "   ".into(), "reboot".into()]);
        assert!(!denied(&deny, "ls"));
        assert!(denied(&deny, "reboot now"));
    }
}
