//! Shell command implementations
use std::io::Write;
use storage::{BlockDevice, VolumeSession};

/// What the shell does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// A shell command result
pub type CommandResult = Result<Flow, String>;

/// Execute a command with its arguments
///
/// # Errors
///
/// Returns `Err(String)` if the command was not recognized, was misused, or failed.
/// The message is meant to be shown to the user as is.
pub fn execute_command<D: BlockDevice>(
    command: &str,
    args: &[String],
    session: &mut VolumeSession<D>,
    out: &mut impl Write,
) -> CommandResult {
    match command {
        "" => Ok(Flow::Continue),
        "exit" => Ok(Flow::Exit),
        "help" => emit(out, HELP),
        "info" => emit(out, format!("{}\n", session.info())),
        "pwd" => emit(out, format!("{}\n", session.pwd())),
        "ls" => cmd_ls(session, out),
        "lsof" => cmd_lsof(session, out),
        "cd" => {
            let [name] = expect_args(args, "cd [DIRNAME]")?;
            session.cd(name).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        "mkdir" => {
            let [name] = expect_args(args, "mkdir [DIRNAME]")?;
            session.mkdir(name).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        "creat" | "touch" => {
            let [name] = expect_args(args, "creat [FILENAME]")?;
            session.creat(name).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        "open" => {
            let [name, mode] = expect_args(args, "open [FILENAME] [-r|-w|-rw|-wr]")?;
            session.open(name, mode).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        "close" => {
            let [name] = expect_args(args, "close [FILENAME]")?;
            session.close(name).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        "size" => {
            let [name] = expect_args(args, "size [FILENAME]")?;
            let size = session.size(name).map_err(|e| e.to_string())?;
            emit(out, format!("{size}\n"))
        }
        "lseek" => {
            let [name, offset] = expect_args(args, "lseek [FILENAME] [OFFSET]")?;
            let offset = parse_number(offset, "offset")?;
            session.lseek(name, offset).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        "read" => {
            let [name, size] = expect_args(args, "read [FILENAME] [SIZE]")?;
            let size = parse_number(size, "size")?;
            let bytes = session.read(name, size).map_err(|e| e.to_string())?;
            // Output stops at the first NUL, like a C string.
            let text = bytes.split(|&b| b == 0).next().unwrap_or_default();
            emit(out, format!("{}\n", String::from_utf8_lossy(text)))
        }
        "write" => cmd_write(args, session),
        "rename" => {
            let [old, new] = expect_args(args, "rename [FILENAME] [NEW_FILENAME]")?;
            session.rename(old, new).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        "rm" => {
            let [name] = expect_args(args, "rm [FILENAME]")?;
            session.rm(name).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        "rmdir" => {
            let [name] = expect_args(args, "rmdir [DIRNAME]")?;
            session.rmdir(name).map_err(|e| e.to_string())?;
            Ok(Flow::Continue)
        }
        _ => Err(format!("Unknown command: {command}")),
    }
}

/// Parse a command line into a command and arguments
pub fn parse_command_line(line: &str) -> (String, Vec<String>) {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("").to_string();
    let args = parts.map(ToString::to_string).collect();
    (command, args)
}

/// The prompt shown before each command: image name followed by the working directory.
pub fn prompt<D: BlockDevice>(session: &VolumeSession<D>) -> String {
    format!("{}{}> ", session.image_name(), session.pwd())
}

const HELP: &str = "\
FAT32 image shell - Available commands:
  info                    - Show the volume layout
  pwd                     - Print the working directory
  cd [DIRNAME]            - Change directory (. and .. supported)
  ls                      - List the working directory
  mkdir [DIRNAME]         - Create a directory
  creat [FILENAME]        - Create an empty file (alias: touch)
  open [FILENAME] [MODE]  - Open a file with -r, -w, -rw or -wr
  close [FILENAME]        - Close an open file
  lsof                    - List open files
  size [FILENAME]         - Print the size of a file
  lseek [FILENAME] [OFF]  - Move the cursor of an open file
  read [FILENAME] [SIZE]  - Read bytes at the cursor
  write [FILENAME] [TEXT] - Write text at the cursor
  rename [OLD] [NEW]      - Rename a file or directory
  rm [FILENAME]           - Delete a file
  rmdir [DIRNAME]         - Delete an empty directory
  help                    - Display this help text
  exit                    - Unmount the image and quit
";

fn emit(out: &mut impl Write, text: impl AsRef<str>) -> CommandResult {
    out.write_all(text.as_ref().as_bytes())
        .map_err(|e| format!("Cannot write output: {e}"))?;
    Ok(Flow::Continue)
}

/// Checks the argument count, turning a mismatch into a usage message.
fn expect_args<'a, const N: usize>(args: &'a [String], usage: &str) -> Result<[&'a str; N], String> {
    if args.len() != N {
        return Err(format!("Usage: {usage}"));
    }
    Ok(core::array::from_fn(|i| args[i].as_str()))
}

fn parse_number(value: &str, what: &str) -> Result<u32, String> {
    value.parse().map_err(|_| format!("Invalid {what}: {value}"))
}

/// List the working directory, directories in blue
fn cmd_ls<D: BlockDevice>(session: &mut VolumeSession<D>, out: &mut impl Write) -> CommandResult {
    let entries = session.ls().map_err(|e| e.to_string())?;
    let mut line = String::new();
    for entry in &entries {
        if entry.metadata().is_dir() {
            line.push_str(&format!("\x1b[34m{}\x1b[0m    ", entry.name()));
        } else {
            line.push_str(&format!("{}    ", entry.name()));
        }
    }
    line.push('\n');
    emit(out, line)
}

fn cmd_lsof<D: BlockDevice>(session: &VolumeSession<D>, out: &mut impl Write) -> CommandResult {
    let mut text = String::new();
    for (index, file) in session.lsof() {
        text.push_str(&format!(
            "{index}: {} {} {} {}\n",
            file.name(),
            file.mode(),
            file.offset(),
            file.path()
        ));
    }
    if text.is_empty() {
        text.push_str("No files opened.\n");
    }
    emit(out, text)
}

/// Write the remaining arguments, joined by spaces, to an open file
///
/// Surrounding double quotes are dropped.
fn cmd_write<D: BlockDevice>(args: &[String], session: &mut VolumeSession<D>) -> CommandResult {
    let [name, words @ ..] = args else {
        return Err("Usage: write [FILENAME] [TEXT]".to_string());
    };
    if words.is_empty() {
        return Err("Usage: write [FILENAME] [TEXT]".to_string());
    }

    let text = words.join(" ");
    let text = text
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(&text);
    session
        .write(name, text.as_bytes())
        .map_err(|e| e.to_string())?;
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use storage::dev::MemDevice;

    fn session() -> VolumeSession<MemDevice> {
        let mut cursor = Cursor::new(vec![0u8; 40 * 1024 * 1024]);
        fatfs::format_volume(
            &mut cursor,
            fatfs::FormatVolumeOptions::new().fat_type(fatfs::FatType::Fat32),
        )
        .unwrap();
        VolumeSession::from_device(MemDevice::from_vec(cursor.into_inner()), "disk.img").unwrap()
    }

    fn run(session: &mut VolumeSession<MemDevice>, line: &str) -> Result<String, String> {
        let (command, args) = parse_command_line(line);
        let mut out = Vec::new();
        execute_command(&command, &args, session, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_command_line() {
        let (command, args) = parse_command_line("  write  notes hello   world ");
        assert_eq!(command, "write");
        assert_eq!(args, ["notes", "hello", "world"]);
        assert_eq!(parse_command_line(""), (String::new(), Vec::new()));
    }

    #[test]
    fn test_file_workflow() {
        let mut session = session();
        assert_eq!(run(&mut session, "creat notes"), Ok(String::new()));
        assert_eq!(run(&mut session, "open notes -rw"), Ok(String::new()));
        assert_eq!(run(&mut session, "write notes \"hello world\""), Ok(String::new()));
        assert_eq!(run(&mut session, "size notes"), Ok("11\n".to_owned()));
        assert_eq!(
            run(&mut session, "lsof"),
            Ok("0: NOTES rw 11 /NOTES\n".to_owned())
        );
        assert_eq!(run(&mut session, "lseek notes 6"), Ok(String::new()));
        assert_eq!(run(&mut session, "read notes 100"), Ok("world\n".to_owned()));
        assert_eq!(run(&mut session, "close notes"), Ok(String::new()));
        assert_eq!(run(&mut session, "lsof"), Ok("No files opened.\n".to_owned()));
    }

    #[test]
    fn test_read_stops_at_nul() {
        let mut session = session();
        session.creat("bin").unwrap();
        session.open("bin", "-rw").unwrap();
        session.write("bin", b"text\0hidden").unwrap();
        session.lseek("bin", 0).unwrap();

        assert_eq!(run(&mut session, "read bin 100"), Ok("text\n".to_owned()));
        assert_eq!(session.lsof().next().unwrap().1.offset(), 11);
    }

    #[test]
    fn test_directories_and_prompt() {
        let mut session = session();
        assert_eq!(prompt(&session), "disk.img/> ");
        run(&mut session, "mkdir sub").unwrap();
        run(&mut session, "touch file").unwrap();
        assert_eq!(
            run(&mut session, "ls"),
            Ok("\x1b[34mSUB\x1b[0m    FILE    \n".to_owned())
        );

        run(&mut session, "cd sub").unwrap();
        assert_eq!(run(&mut session, "pwd"), Ok("/SUB\n".to_owned()));
        assert_eq!(prompt(&session), "disk.img/SUB> ");
        run(&mut session, "cd ..").unwrap();
        assert_eq!(run(&mut session, "rmdir sub"), Ok(String::new()));
    }

    #[test]
    fn test_errors_and_usage() {
        let mut session = session();
        assert_eq!(run(&mut session, "cd"), Err("Usage: cd [DIRNAME]".to_owned()));
        assert_eq!(run(&mut session, "cd missing"), Err("No such file or directory".to_owned()));
        assert_eq!(run(&mut session, "read a b"), Err("Invalid size: b".to_owned()));
        assert_eq!(run(&mut session, "write onlyname"), Err("Usage: write [FILENAME] [TEXT]".to_owned()));
        assert_eq!(run(&mut session, "frobnicate"), Err("Unknown command: frobnicate".to_owned()));
        assert_eq!(run(&mut session, "close nothing"), Err("File not opened".to_owned()));
    }

    #[test]
    fn test_exit_and_info() {
        let mut session = session();
        let (command, args) = parse_command_line("exit");
        assert_eq!(
            execute_command(&command, &args, &mut session, &mut Vec::<u8>::new()),
            Ok(Flow::Exit)
        );
        let info = run(&mut session, "info").unwrap();
        assert!(info.starts_with("position of root cluster: 2\n"));
        assert!(info.ends_with(&format!("size of image (in bytes): {}\n", 40 * 1024 * 1024)));
    }
}
