//! # Command (Request) Handlers
//!
//! [Commands](https://redis.io/docs/latest/commands/)
//!
//! [COMMAND](https://redis.io/docs/latest/commands/command/): Redis command names are
//! case-insensitive.
//!
//! [Redis serialization protocol specification](https://redis.io/docs/latest/develop/reference/protocol-spec/)
//!
//! The dispatcher is stateless: it turns one parsed [`Frame`] plus a [`Store`] handle into one
//! response [`Frame`]. It never panics on malformed input: every failure path here converts to
//! an `Error` reply and leaves the connection open.

use crate::errors::CmdError;
use crate::resp::Frame;
use crate::storage::Store;
use std::time::{Duration, Instant};

/// Dispatches a single parsed request [`Frame`] against `store`, returning the reply [`Frame`].
pub fn dispatch(frame: &Frame, store: &Store) -> Frame {
    let args = match extract_args(frame) {
        Ok(args) => args,
        Err(err) => return Frame::error(err.to_string()),
    };
    // `extract_args` only returns `Ok` for a non-empty argument list.
    let (name, rest) = args.split_first().expect("non-empty by construction");

    match name.to_ascii_uppercase().as_str() {
        "PING" => cmd_ping(rest),
        "ECHO" => cmd_echo(rest),
        "INFO" => cmd_info(rest),
        "COMMAND" => Frame::BulkString(Some("OK".into())),
        "SET" => cmd_set(rest, store),
        "GET" => cmd_get(rest, store),
        "INCR" => cmd_incr(rest, store),
        "DECR" => cmd_decr(rest, store),
        "EXISTS" => cmd_exists(rest, store),
        "LPUSH" => cmd_lpush(rest, store),
        "RPUSH" => cmd_rpush(rest, store),
        "LRANGE" => cmd_lrange(rest, store),
        _ => Frame::error(CmdError::UnrecognizedCmd.to_string()),
    }
}

/// Pulls the command name and arguments out of a request [`Frame`].
///
/// A request must be an `Array` of `BulkString`s; anything else, or an empty/null array, is a
/// [`CmdError`] rather than a panic.
fn extract_args(frame: &Frame) -> Result<Vec<String>, CmdError> {
    match frame {
        Frame::Array(None) => Err(CmdError::EmptyCommand),
        Frame::Array(Some(elems)) if elems.is_empty() => Err(CmdError::EmptyCommand),
        Frame::Array(Some(elems)) => elems
            .iter()
            .map(|elem| match elem {
                Frame::BulkString(Some(s)) => Ok(s.clone()),
                _ => Err(CmdError::NotAnArray),
            })
            .collect(),
        _ => Err(CmdError::NotAnArray),
    }
}

fn arity_error(command: &str) -> Frame {
    Frame::error(CmdError::WrongArity(command.to_string()).to_string())
}

fn not_an_integer() -> Frame {
    Frame::error(CmdError::NotAnInteger.to_string())
}

fn cmd_ping(args: &[String]) -> Frame {
    match args {
        [] => Frame::SimpleString("PONG".into()),
        [msg] => Frame::SimpleString(msg.clone()),
        _ => arity_error("ping"),
    }
}

fn cmd_echo(args: &[String]) -> Frame {
    if args.is_empty() {
        return arity_error("echo");
    }
    Frame::BulkString(Some(args.join(" ")))
}

fn cmd_info(args: &[String]) -> Frame {
    match args.first() {
        Some(section) if section.eq_ignore_ascii_case("SERVER") => {
            Frame::BulkString(Some("# Server\nredis_version:0.1.0\n".into()))
        }
        _ => Frame::BulkString(Some(String::new())),
    }
}

/// `SET key value [EX seconds | PX millis]`
fn cmd_set(args: &[String], store: &Store) -> Frame {
    let expiry = match args.len() {
        2 => None,
        4 => match parse_ttl(&args[2], &args[3]) {
            Ok(at) => at,
            Err(frame) => return frame,
        },
        _ => return arity_error("set"),
    };
    store.set(args[0].clone(), args[1].clone(), expiry)
}

/// Parses the `EX seconds` / `PX millis` suffix of `SET` into an absolute [`Instant`].
fn parse_ttl(option: &str, raw_amount: &str) -> Result<Option<Instant>, Frame> {
    let amount: i64 = raw_amount.parse().map_err(|_| not_an_integer())?;
    if amount < 0 {
        return Err(Frame::error("invalid expire time in 'set' command"));
    }
    let amount = amount as u64;
    match option.to_ascii_uppercase().as_str() {
        "EX" => Ok(Some(Instant::now() + Duration::from_secs(amount))),
        "PX" => Ok(Some(Instant::now() + Duration::from_millis(amount))),
        _ => Err(arity_error("set")),
    }
}

fn cmd_get(args: &[String], store: &Store) -> Frame {
    match args {
        [key] => store.get(key),
        _ => arity_error("get"),
    }
}

fn cmd_incr(args: &[String], store: &Store) -> Frame {
    match args {
        [key] => store.incr(key),
        _ => arity_error("incr"),
    }
}

fn cmd_decr(args: &[String], store: &Store) -> Frame {
    match args {
        [key] => store.decr(key),
        _ => arity_error("decr"),
    }
}

fn cmd_exists(args: &[String], store: &Store) -> Frame {
    if args.is_empty() {
        return arity_error("exists");
    }
    store.exists(args)
}

fn cmd_lpush(args: &[String], store: &Store) -> Frame {
    if args.len() < 2 {
        return arity_error("lpush");
    }
    store.lpush(&args[0], &args[1..])
}

fn cmd_rpush(args: &[String], store: &Store) -> Frame {
    if args.len() < 2 {
        return arity_error("rpush");
    }
    store.rpush(&args[0], &args[1..])
}

fn cmd_lrange(args: &[String], store: &Store) -> Frame {
    let [key, start, stop] = args else {
        return arity_error("lrange");
    };
    let (Ok(start), Ok(stop)) = (start.parse::<i64>(), stop.parse::<i64>()) else {
        return not_an_integer();
    };
    store.lrange(key, start, stop)
}
