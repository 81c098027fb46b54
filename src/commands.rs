/// Command-mode commands and autocomplete logic
use crate::api::ResourceKind;

/// What a command does when run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTarget {
  /// Open the list view of a collection
  Open(ResourceKind),
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub target: CommandTarget,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "schools",
    aliases: &["sc", "school"],
    description: "Browse schools",
    target: CommandTarget::Open(ResourceKind::School),
  },
  Command {
    name: "students",
    aliases: &["st", "student"],
    description: "Browse students",
    target: CommandTarget::Open(ResourceKind::Student),
  },
  Command {
    name: "teachers",
    aliases: &["t", "teacher"],
    description: "Browse teachers",
    target: CommandTarget::Open(ResourceKind::Teacher),
  },
  Command {
    name: "subjects",
    aliases: &["su", "subject"],
    description: "Browse subjects",
    target: CommandTarget::Open(ResourceKind::Subject),
  },
  Command {
    name: "classes",
    aliases: &["c", "class", "subjectclass", "subject-classes"],
    description: "Browse subject classes",
    target: CommandTarget::Open(ResourceKind::SubjectClass),
  },
  Command {
    name: "registrations",
    aliases: &["r", "reg", "register", "register_class"],
    description: "Browse class registrations",
    target: CommandTarget::Open(ResourceKind::RegisterClass),
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit schooladm",
    target: CommandTarget::Quit,
  },
];

/// Rank of `cmd` against lowercase `input`; lower is better, `None` means no match
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  let checks: [(bool, u32); 6] = [
    (cmd.name == input, 0),
    (cmd.aliases.contains(&input), 1),
    (cmd.name.starts_with(input), 2),
    (cmd.aliases.iter().any(|a| a.starts_with(input)), 3),
    (cmd.name.contains(input), 4),
    (cmd.aliases.iter().any(|a| a.contains(input)), 5),
  ];
  checks
    .into_iter()
    .find(|(matched, _)| *matched)
    .map(|(_, rank)| rank)
}

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&'static Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (cmd, rank)))
    .collect();

  // Stable sort keeps declaration order among equal ranks
  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve a submitted command name
pub fn find(name: &str) -> Option<&'static Command> {
  get_suggestions(name).into_iter().next()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("teachers");
    assert_eq!(suggestions[0].name, "teachers");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("reg");
    assert_eq!(suggestions[0].name, "registrations");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("stu");
    assert_eq!(suggestions[0].name, "students");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("bjec");
    assert_eq!(suggestions[0].name, "subjects");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
    assert!(find("zzz").is_none());
  }

  #[test]
  fn test_find_resolves_target() {
    assert_eq!(
      find("classes").map(|c| c.target),
      Some(CommandTarget::Open(ResourceKind::SubjectClass))
    );
    assert_eq!(find("q").map(|c| c.target), Some(CommandTarget::Quit));
  }
}
