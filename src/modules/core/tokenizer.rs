//! Shell-like command tokenizer
//!
//! Splits a raw command line into an argument vector without invoking a shell.
//! Only whitespace separation, single/double quoting and backslash escapes are
//! understood; pipes, redirection and variable expansion are passed through as
//! plain characters.
//!
//! Escapes are honoured for word boundaries only: a backslash stops the
//! following character from ending a word or closing a quote, but both
//! characters are kept in the emitted argument (`a\ b` yields `a\ b`).

use crate::modules::error::ModuleError;

/// Split `command` into arguments.
///
/// A word that starts with `"` or `'` runs to the matching unescaped quote and
/// is emitted without its enclosing quotes. A quote with no match makes the rest
/// of the input, taken verbatim, the final argument.
pub fn tokenize(command: &str) -> Result<Vec<String>, ModuleError> {
    let chars: Vec<char> = command.chars().collect();
    let len = chars.len();
    let mut args = Vec::new();
    let mut i = 0;

    while i < len {
        let Some(start) = skip_space(&chars, i) else {
            break;
        };
        i = start;

        let mut j = start;
        let mut closed = false;
        while j < len {
            let c = chars[j];
            if c.is_whitespace() {
                push_argument(&chars[i..j], &mut args);
                i = j + 1;
                closed = true;
                break;
            } else if c == '\\' {
                j += 2;
                continue;
            } else if c == '"' || c == '\'' {
                match find_char(&chars, j + 1, c) {
                    Some(k) => {
                        push_argument(&chars[i..=k], &mut args);
                        i = k + 1;
                    }
                    None => {
                        args.push(chars[i..].iter().collect());
                        i = len;
                    }
                }
                closed = true;
                break;
            }
            j += 1;
        }

        if !closed {
            push_argument(&chars[i..], &mut args);
            i = len;
        }
    }

    if args.is_empty() {
        return Err(ModuleError::EmptyCommand);
    }
    Ok(args)
}

fn skip_space(chars: &[char], offset: usize) -> Option<usize> {
    (offset..chars.len()).find(|&i| !chars[i].is_whitespace())
}

/// Position of the next unescaped `quote` at or after `offset`
fn find_char(chars: &[char], offset: usize, quote: char) -> Option<usize> {
    let mut i = offset;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn push_argument(word: &[char], args: &mut Vec<String>) {
    match word.first() {
        Some('"') | Some('\'') if word.len() >= 2 => {
            args.push(word[1..word.len() - 1].iter().collect());
        }
        _ => args.push(word.iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(command: &str) -> Vec<String> {
        tokenize(command).unwrap()
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(split("a b"), vec!["a", "b"]);
        assert_eq!(split("  ls   -la\t/tmp \n"), vec!["ls", "-la", "/tmp"]);
    }

    #[test]
    fn test_double_quotes_are_stripped() {
        assert_eq!(split("a \"b c\" d"), vec!["a", "b c", "d"]);
    }

    #[test]
    fn test_single_quotes_are_stripped() {
        assert_eq!(
            split("sh -c 'echo hello; exit 3'"),
            vec!["sh", "-c", "echo hello; exit 3"]
        );
    }

    #[test]
    fn test_empty_quoted_argument() {
        assert_eq!(split("echo \"\" x"), vec!["echo", "", "x"]);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(tokenize(""), Err(ModuleError::EmptyCommand)));
        assert!(matches!(tokenize("  "), Err(ModuleError::EmptyCommand)));
        assert!(matches!(tokenize("\t\n"), Err(ModuleError::EmptyCommand)));
    }

    #[test]
    fn test_backslash_escapes_are_kept() {
        assert_eq!(split("echo a\\ b"), vec!["echo", "a\\ b"]);
        assert_eq!(split("echo \"say \\\"hi\\\"\""), vec!["echo", "say \\\"hi\\\""]);
    }

    #[test]
    fn test_trailing_backslash() {
        assert_eq!(split("echo abc\\"), vec!["echo", "abc\\"]);
    }

    #[test]
    fn test_unterminated_quote_takes_rest_verbatim() {
        assert_eq!(split("echo \"abc def"), vec!["echo", "\"abc def"]);
        assert_eq!(split("echo 'x"), vec!["echo", "'x"]);
    }

    #[test]
    fn test_quote_ends_word() {
        assert_eq!(split("\"abc\"def"), vec!["abc", "def"]);
        assert_eq!(split("foo\"bar baz\" q"), vec!["foo\"bar baz\"", "q"]);
    }

    #[test]
    fn test_shell_operators_are_plain_words() {
        assert_eq!(
            split("cat /etc/hosts | grep $HOME > out"),
            vec!["cat", "/etc/hosts", "|", "grep", "$HOME", ">", "out"]
        );
    }

    #[test]
    fn test_multibyte_input() {
        assert_eq!(split("echo 'héllo wörld' ü"), vec!["echo", "héllo wörld", "ü"]);
    }
}
