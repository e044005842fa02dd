//! Command-line front end for STx radiation counters.
//!
//! Options are executed in the order given, for example `stxusb -01 -04`
//! starts the counter and then reads the counts. Set `STX_DEVICE` to skip
//! USB discovery and use a specific port.

use anyhow::Context;
use std::env;
use std::io::{stdin, BufRead};
use stxusb::{Command, Device, Error};

/// Flag spellings for each command: numeric form first, then an alias.
const COMMAND_FLAGS: [(&str, Option<&str>, Command); 15] = [
    ("-00", Some("-reset"), Command::ResetDevice),
    ("-01", Some("-start"), Command::StartCounter),
    ("-02", Some("-stop"), Command::StopCounter),
    ("-03", Some("-status"), Command::RequestStatus),
    ("-04", Some("-counts"), Command::RequestCounts),
    ("-05", Some("-param"), Command::RequestParameters),
    ("-06", Some("-system"), Command::RequestSystemParameters),
    ("-07", Some("-store"), Command::StoreCurrentParameters),
    ("-08", Some("-demo"), Command::StartDemoCounter),
    ("-12", Some("-hvon"), Command::HighVoltageOn),
    ("-13", Some("-hvoff"), Command::HighVoltageOff),
    ("-14", None, Command::HighVoltageOneWireOn),
    ("-15", None, Command::HighVoltageOneWireOff),
    ("-16", Some("-hvstatus"), Command::RequestHighVoltageStatus),
    ("-17", Some("-hvdata"), Command::ReadHighVoltageData),
];

const HELP_FLAGS: &[&str] = &["-help", "/help", "help", "-info", "-h", "/h", "-?", "/?"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Run(Command),
    Exit,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Invocation {
    help: bool,
    verbose: bool,
    interactive: bool,
    actions: Vec<Action>,
    unknown: Vec<String>,
}

fn command_for_flag(flag: &str) -> Option<Command> {
    COMMAND_FLAGS
        .iter()
        .find(|(numeric, alias, _)| *numeric == flag || *alias == Some(flag))
        .map(|(_, _, command)| *command)
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Invocation {
    let mut invocation = Invocation::default();
    let mut any = false;
    for arg in args {
        any = true;
        match arg.as_str() {
            "-v" | "-verbose" => invocation.verbose = true,
            "-i" | "-interactive" => invocation.interactive = true,
            "-e" | "-exit" => invocation.actions.push(Action::Exit),
            flag if HELP_FLAGS.contains(&flag) => {
                invocation.help = true;
                break;
            }
            flag => match command_for_flag(flag) {
                Some(command) => invocation.actions.push(Action::Run(command)),
                None => invocation.unknown.push(flag.to_string()),
            },
        }
    }
    if !any {
        invocation.help = true;
    }
    invocation
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "stxusb=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn connect() -> anyhow::Result<Device> {
    match env::var("STX_DEVICE") {
        Ok(path) => Device::new(path.clone()).with_context(|| format!("opening {}", path)),
        Err(_) => Device::discover().context("locating STx counter over USB"),
    }
}

fn report(code: &str, outcome: Result<String, Error>) {
    match outcome {
        Ok(reply) => println!("{}: {}", code, reply),
        Err(err) => println!("{}: error: {}", code, err),
    }
    println!();
}

/// Runs the actions in order. Returns `false` if an exit was requested.
fn run_actions(device: &Device, actions: &[Action]) -> bool {
    for action in actions {
        match action {
            Action::Exit => return false,
            Action::Run(command) => report(command.code(), device.execute(*command)),
        }
    }
    true
}

fn run_interactive(device: &Device) -> anyhow::Result<()> {
    for line in stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "-e" | "-exit" => break,
            _ => {
                let code = command_for_flag(input).map_or(input, |command| command.code());
                report(code, device.send_command(code));
            }
        }
    }
    Ok(())
}

fn run(device: &Device, invocation: &Invocation) -> anyhow::Result<()> {
    if run_actions(device, &invocation.actions) && invocation.interactive {
        run_interactive(device)?;
    }
    Ok(())
}

fn print_help() {
    println!();
    println!("STx USB console application");
    println!("==============================================================");
    println!();
    println!("USAGE: stxusb -option1 -option2 -option3 ...");
    println!();
    println!("Where options are:");
    println!("     {:<24}Display this help message", "-? or -h or -help");
    for (numeric, alias, command) in COMMAND_FLAGS {
        let flags = match alias {
            Some(alias) => format!("{} or {}", numeric, alias),
            None => numeric.to_string(),
        };
        println!("     {:<24}{}", flags, command.description());
    }
    println!("     {:<24}Exit, skipping any remaining options", "-e or -exit");
    println!("     {:<24}Read further commands from stdin", "-i or -interactive");
    println!("     {:<24}Verbose, show more output", "-v or -verbose");
    println!();
    println!("Options are executed in the order given. Each command prints");
    println!("`code: reply`; the reply format is described in the STX");
    println!("programming guide. Set STX_DEVICE to bypass USB discovery.");
    println!();
    println!("Examples:");
    println!("     stxusb -01              start counter");
    println!("     stxusb -04 -v           show detailed information and request counts");
}

fn main() {
    let invocation = parse_args(env::args().skip(1));
    init_logging(invocation.verbose);

    if invocation.help {
        print_help();
        return;
    }

    if invocation.verbose && !invocation.unknown.is_empty() {
        println!("Unknown options given:");
        for arg in &invocation.unknown {
            println!("  {}", arg);
        }
    }

    if invocation.verbose {
        println!("Start initializing connection with device");
    }
    let device = match connect() {
        Ok(device) => device,
        Err(err) => {
            if invocation.verbose {
                println!("Error on initiating connection: {:#}", err);
            }
            println!("Failed to connect to the STx radiation counter");
            return;
        }
    };
    if invocation.verbose {
        println!("Port found: {}", device.endpoint());
    }
    println!();

    if let Err(err) = run(&device, &invocation) {
        println!("Error: {:#}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Invocation {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_shows_help() {
        assert!(parse(&[]).help);
    }

    #[test]
    fn help_stops_parsing() {
        for flag in HELP_FLAGS {
            let invocation = parse(&["-01", *flag, "-02"]);
            assert!(invocation.help, "{}", flag);
            assert_eq!(invocation.actions, [Action::Run(Command::StartCounter)]);
        }
    }

    #[test]
    fn commands_keep_argument_order() {
        let invocation = parse(&["-counts", "-v", "-01", "-e", "-hvoff", "-bogus"]);
        assert!(invocation.verbose);
        assert!(!invocation.help);
        assert_eq!(
            invocation.actions,
            [
                Action::Run(Command::RequestCounts),
                Action::Run(Command::StartCounter),
                Action::Exit,
                Action::Run(Command::HighVoltageOff),
            ]
        );
        assert_eq!(invocation.unknown, ["-bogus"]);
    }

    #[test]
    fn every_command_has_a_numeric_flag() {
        for command in Command::ALL {
            let flag = format!("-{}", command.code());
            assert_eq!(command_for_flag(&flag), Some(command));
        }
        assert_eq!(command_for_flag("-09"), None);
    }
}
