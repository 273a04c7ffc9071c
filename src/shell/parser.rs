//! Splits a raw input line into a pipeline of commands, or passes it through as chat text.
//!
//! A line is a command when it starts with the `/` marker, or (in shell mode) when its first
//! word names a registered command. Anything else is chat text and is returned untouched; it is
//! never tokenized, so an apostrophe in prose cannot cause a quoting error.
//!
//! Command lines are variable-expanded, then split into words:
//!
//! - whitespace separates words; `'...'` and `"..."` group, and quoted and unquoted parts
//!   next to each other form one word (`--name="a b"`)
//! - a backslash outside single quotes makes the next character literal
//! - an unquoted `|` separates pipeline stages

use super::dispatcher::CommandRegistry;
use super::mode::Mode;
use super::variables::Variables;
use crate::error::ParseError;

/// Prefix forcing a line to be read as a command
pub const COMMAND_MARKER: char = '/';

/// One stage of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Chat(String),
    /// Empty for a blank line
    Pipeline(Vec<CommandInvocation>),
}

/// Classify and tokenize one input line
pub fn parse(
    raw: &str,
    registry: &CommandRegistry,
    variables: &Variables,
    mode: Mode,
) -> Result<ParsedInput, ParseError> {
    let line = raw.trim();
    if line.is_empty() {
        return Ok(ParsedInput::Pipeline(Vec::new()));
    }

    let command_line = match line.strip_prefix(COMMAND_MARKER) {
        Some(rest) => rest,
        None if mode == Mode::Shell && registry.contains(first_word(line)) => line,
        None => return Ok(ParsedInput::Chat(line.to_string())),
    };

    let expanded = variables.expand(command_line);
    let stages = split_pipeline(&expanded)?;
    Ok(ParsedInput::Pipeline(
        stages
            .into_iter()
            .filter_map(|mut words| {
                if words.is_empty() {
                    return None;
                }
                let name = words.remove(0);
                Some(CommandInvocation { name, args: words })
            })
            .collect(),
    ))
}

fn first_word(line: &str) -> &str {
    line.split(|c: char| c.is_whitespace() || c == '|').next().unwrap_or("")
}

/// Split an expanded command line into stages of words.
///
/// A line with no words at all yields no stages; otherwise every stage must have a word.
pub fn split_pipeline(input: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let mut stages: Vec<Vec<String>> = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut saw_pipe = false;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '|' => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
                if words.is_empty() {
                    return Err(ParseError::EmptyStage(stages.len() + 1));
                }
                stages.push(std::mem::take(&mut words));
                saw_pipe = true;
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(ParseError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => word.push(c),
                            None => return Err(ParseError::UnterminatedQuote('"')),
                        },
                        Some(c) => word.push(c),
                        None => return Err(ParseError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                // A trailing backslash stands for itself
                word.push(chars.next().unwrap_or('\\'));
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }
    if words.is_empty() {
        if saw_pipe {
            return Err(ParseError::EmptyStage(stages.len() + 1));
        }
    } else {
        stages.push(words);
    }

    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::commands::default_registry;
    use crate::shell::variables::PWD;

    fn shell(raw: &str) -> Result<ParsedInput, ParseError> {
        let vars = Variables::new().with(PWD, "/chats/abc");
        parse(raw, &default_registry(), &vars, Mode::Shell)
    }

    fn pipeline(raw: &str) -> Vec<CommandInvocation> {
        match shell(raw).unwrap() {
            ParsedInput::Pipeline(stages) => stages,
            ParsedInput::Chat(text) => panic!("expected a command, got chat: {}", text),
        }
    }

    fn words(input: &str) -> Vec<Vec<String>> {
        split_pipeline(input).unwrap()
    }

    #[test]
    fn test_blank_line_is_empty_pipeline() {
        assert_eq!(shell("   ").unwrap(), ParsedInput::Pipeline(vec![]));
    }

    #[test]
    fn test_registered_first_word_is_a_command() {
        let stages = pipeline("LS -l /chats");
        assert_eq!(stages[0].name, "LS");
        assert_eq!(stages[0].args, vec!["-l", "/chats"]);
    }

    #[test]
    fn test_prose_is_chat_and_never_tokenized() {
        let text = "don't worry about \"quotes | pipes";
        assert_eq!(shell(text).unwrap(), ParsedInput::Chat(text.to_string()));
    }

    #[test]
    fn test_marker_forces_command() {
        let stages = pipeline("/whatever arg");
        assert_eq!(stages[0].name, "whatever");
    }

    #[test]
    fn test_chat_mode_only_honours_marker() {
        let registry = default_registry();
        let vars = Variables::new();
        assert_eq!(
            parse("ls is my favourite command", &registry, &vars, Mode::Chat).unwrap(),
            ParsedInput::Chat("ls is my favourite command".to_string())
        );
        assert!(matches!(
            parse("/exit", &registry, &vars, Mode::Chat).unwrap(),
            ParsedInput::Pipeline(stages) if stages[0].name == "exit"
        ));
    }

    #[test]
    fn test_pipeline_stages() {
        let stages = pipeline("cat m1|grep -i rust | wc -l");
        let names: Vec<&str> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["cat", "grep", "wc"]);
        assert_eq!(stages[1].args, vec!["-i", "rust"]);
    }

    #[test]
    fn test_quotes_group_and_join() {
        assert_eq!(words(r#"tag "work notes" x"#), vec![vec!["tag", "work notes", "x"]]);
        assert_eq!(words(r#"find title:"a b"c"#), vec![vec!["find", "title:a bc"]]);
        assert_eq!(words("echo 'a | b'"), vec![vec!["echo", "a | b"]]);
        assert_eq!(words(r#"echo "" x"#), vec![vec!["echo", "", "x"]]);
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(words(r"echo a\ b \| c"), vec![vec!["echo", "a b", "|", "c"]]);
        assert_eq!(words(r"echo '\n'"), vec![vec!["echo", r"\n"]]);
        assert_eq!(words(r#"echo "say \"hi\"""#), vec![vec!["echo", r#"say "hi""#]]);
        assert_eq!(words(r"echo end\"), vec![vec!["echo", r"end\"]]);
    }

    #[test]
    fn test_variables_expand_before_splitting() {
        let stages = pipeline("cd $PWD/m1");
        assert_eq!(stages[0].args, vec!["/chats/abc/m1"]);
        let stages = pipeline(r"echo \$PWD");
        assert_eq!(stages[0].args, vec!["$PWD"]);
    }

    #[test]
    fn test_unterminated_quotes() {
        assert_eq!(shell("echo 'oops"), Err(ParseError::UnterminatedQuote('\'')));
        assert_eq!(shell("echo \"oops"), Err(ParseError::UnterminatedQuote('"')));
    }

    #[test]
    fn test_empty_stages() {
        assert_eq!(shell("ls | | wc"), Err(ParseError::EmptyStage(2)));
        assert_eq!(shell("ls |"), Err(ParseError::EmptyStage(2)));
        assert_eq!(split_pipeline("| wc"), Err(ParseError::EmptyStage(1)));
    }
}
