//! FTP command table and line parser

/// Commands the engine understands. Anything else is `NotSupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Feat,
    Syst,
    Cdup,
    Cwd,
    Pwd,
    Xpwd,
    Size,
    Mdtm,
    Type,
    User,
    Pass,
    Pasv,
    List,
    Retr,
    Stor,
    Dele,
    Rmd,
    Mkd,
    Rnfr,
    Rnto,
    Noop,
    Quit,
    NotSupported,
}

/// Longest mnemonic in the table.
const MAX_COMMAND_LEN: usize = 5;

const COMMAND_TABLE: [(&str, Command); 22] = [
    ("FEAT", Command::Feat),
    ("SYST", Command::Syst),
    ("CDUP", Command::Cdup),
    ("CWD", Command::Cwd),
    ("PWD", Command::Pwd),
    ("XPWD", Command::Xpwd),
    ("SIZE", Command::Size),
    ("MDTM", Command::Mdtm),
    ("TYPE", Command::Type),
    ("USER", Command::User),
    ("PASS", Command::Pass),
    ("PASV", Command::Pasv),
    ("LIST", Command::List),
    ("RETR", Command::Retr),
    ("STOR", Command::Stor),
    ("DELE", Command::Dele),
    ("RMD", Command::Rmd),
    ("MKD", Command::Mkd),
    ("RNFR", Command::Rnfr),
    ("RNTO", Command::Rnto),
    ("NOOP", Command::Noop),
    ("QUIT", Command::Quit),
];

impl Command {
    /// Commands accepted before the login completes.
    pub fn allowed_before_login(&self) -> bool {
        matches!(self, Command::User | Command::Pass | Command::Quit)
    }
}

/// Splits one command line into its mnemonic and parameter.
///
/// The mnemonic is matched case-insensitively. The parameter is the rest of
/// the line without the separator and line terminator, so names containing
/// spaces survive intact.
pub fn parse_command(line: &str) -> (Command, &str) {
    let line = line.trim_end_matches(['\r', '\n']);
    let (token, param) = match line.find(' ') {
        Some(idx) => (&line[..idx], line[idx + 1..].trim_start_matches(' ')),
        None => (line, ""),
    };

    if token.len() > MAX_COMMAND_LEN {
        return (Command::NotSupported, param);
    }

    let command = COMMAND_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(token))
        .map(|(_, command)| *command)
        .unwrap_or(Command::NotSupported);

    (command, param)
}
