//! Interactive command shell
//!
//! Line-oriented commands over the full profile command surface. Engine and
//! command errors are printed and the shell keeps running; only `quit` (or
//! EOF) leaves it.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use parley_core::types::{FriendId, PublicKey, UserStatus};
use parley_runtime::{ProfileManager, ProfileSession};

const HELP: &str = "\
commands:
  whoami                 show profile identity
  friends                list friends
  name <name>            set the user name
  statusmsg <text>       set the status message
  status <ready|away|busy>
  add <public key>       add a friend by key (no request)
  remove <index>         remove a friend
  msg <index> <text>     send a message
  help                   show this help
  quit                   leave the shell";

pub fn run(manager: &mut ProfileManager) -> ExitCode {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break, // EOF or read error
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(session) = manager.active() else {
            eprintln!("no active session");
            return ExitCode::FAILURE;
        };

        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "help" => println!("{HELP}"),
            "quit" | "exit" => break,
            "whoami" => whoami(session),
            "friends" => friends(session),
            "name" => report(session.set_user_name(rest)),
            "statusmsg" => report(session.set_status_message(rest)),
            "status" => match parse_status(rest) {
                Some(status) => session.set_status(status),
                None => eprintln!("usage: status <ready|away|busy>"),
            },
            "add" => match rest.parse::<PublicKey>() {
                Ok(key) => match session.add_friend_norequest(&key) {
                    Ok(friend) => println!("added friend {friend}"),
                    Err(err) => eprintln!("error: {err}"),
                },
                Err(err) => eprintln!("error: {err}"),
            },
            "remove" => match parse_friend(rest) {
                Some(friend) => report(session.remove_friend(friend)),
                None => eprintln!("usage: remove <index>"),
            },
            "msg" => match rest.split_once(' ') {
                Some((index, text)) => match parse_friend(index) {
                    Some(friend) => report(session.send_message(friend, text.trim())),
                    None => eprintln!("usage: msg <index> <text>"),
                },
                None => eprintln!("usage: msg <index> <text>"),
            },
            _ => eprintln!("unknown command {command:?} (try \"help\")"),
        }
    }

    ExitCode::SUCCESS
}

fn whoami(session: &ProfileSession) {
    println!("profile:        {}", session.name());
    println!("user name:      {:?}", session.user_name());
    println!("status:         {}", session.status());
    println!("status message: {:?}", session.status_message());
    println!("public key:     {}", session.public_key());
    println!("nospam:         {:08X}", session.nospam());
    println!("online:         {}", session.is_online());
}

fn friends(session: &ProfileSession) {
    let friends = session.friends();
    if friends.is_empty() {
        println!("no friends yet");
        return;
    }

    for friend in friends {
        let name = session.friend_name(friend).unwrap_or_default();
        let online = session.friend_is_online(friend).unwrap_or(false);
        let status = session
            .friend_status(friend)
            .unwrap_or(UserStatus::Away);
        let state = if online { "online" } else { "offline" };
        println!("{friend}: {name:?} ({status}, {state})");
    }
}

fn parse_status(input: &str) -> Option<UserStatus> {
    match input {
        "ready" => Some(UserStatus::Ready),
        "away" => Some(UserStatus::Away),
        "busy" => Some(UserStatus::Busy),
        _ => None,
    }
}

fn parse_friend(input: &str) -> Option<FriendId> {
    input.parse::<u32>().ok().map(FriendId::new)
}

fn report(result: Result<(), parley_core::errors::EngineError>) {
    if let Err(err) = result {
        eprintln!("error: {err}");
    }
}
