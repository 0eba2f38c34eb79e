//! Newline-terminated session channel used by ATE hosts to start a simulated
//! board and poke its register bus.  Commands are plain text; every successful
//! command is acknowledged with `OK`, failures with `ERR <detail>`.
//!
//! The protocol state machine is transport-agnostic (`Session::handle_line`);
//! `serve` wires it to a TCP listener, handling one host at a time.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

use crate::bridge::RegisterBridge;
use crate::bus::SystemBus;
use crate::dut::Loopback;

struct Board {
    name: String,
    bus: SystemBus<RegisterBridge<Loopback>>,
}

/// One host connection's worth of protocol state.
#[derive(Default)]
pub struct Session {
    board: Option<Board>,
}

impl Session {
    pub fn new() -> Self {
        Self { board: None }
    }

    /// Process one command line.  Returns the reply text and whether the
    /// session should stay open.
    pub fn handle_line(&mut self, line: &str) -> (String, bool) {
        let mut words = line.split_ascii_whitespace();
        let reply = match words.next() {
            None => String::new(),
            Some("STARTSIM") => self.startsim(words.next()),
            Some("STOPSIM") => self.stopsim(),
            Some("MW") => self.mem_write(words.next(), words.next()),
            Some("MR") => self.mem_read(words.next()),
            Some("EXIT") => return ("Goodbye\r\n".to_string(), false),
            Some(other) => format!("ERR unknown command {other}\r\n"),
        };
        (reply, true)
    }

    fn startsim(&mut self, board: Option<&str>) -> String {
        let Some(name) = board else {
            return "ERR missing board name\r\n".to_string();
        };
        let bridge = RegisterBridge::new(Loopback::new());
        self.board = Some(Board {
            name: name.to_string(),
            bus: SystemBus::new(bridge),
        });
        tracing::info!(board = name, "simulation started");
        "OK\r\n".to_string()
    }

    fn stopsim(&mut self) -> String {
        match self.board.take() {
            Some(board) => {
                tracing::info!(
                    board = %board.name,
                    clocks = board.bus.clocks(),
                    "simulation stopped"
                );
                format!(
                    "Simulation of {} stopped after {} clocks\r\nOK\r\n",
                    board.name,
                    board.bus.clocks()
                )
            }
            None => "ERR no simulation running\r\n".to_string(),
        }
    }

    fn mem_write(&mut self, addr: Option<&str>, data: Option<&str>) -> String {
        let (Some(addr), Some(data)) = (parse_word(addr), parse_word(data)) else {
            return "ERR expected MW <hexaddr> <hexdata>\r\n".to_string();
        };
        let Some(board) = &mut self.board else {
            return "ERR no simulation running\r\n".to_string();
        };
        match board.bus.write(addr, data) {
            Ok(()) => "OK\r\n".to_string(),
            Err(err) => format!("ERR {err}\r\n"),
        }
    }

    fn mem_read(&mut self, addr: Option<&str>) -> String {
        let Some(addr) = parse_word(addr) else {
            return "ERR expected MR <hexaddr>\r\n".to_string();
        };
        let Some(board) = &mut self.board else {
            return "ERR no simulation running\r\n".to_string();
        };
        match board.bus.read(addr) {
            Ok(value) => format!("{value:X}\r\nOK\r\n"),
            Err(err) => format!("ERR {err}\r\n"),
        }
    }
}

fn parse_word(word: Option<&str>) -> Option<u32> {
    let word = word?;
    let digits = word
        .strip_prefix("0x")
        .or_else(|| word.strip_prefix("0X"))
        .unwrap_or(word);
    u32::from_str_radix(digits, 16).ok()
}

/// Accept host connections one at a time and run the line protocol on each
/// until the host says EXIT or hangs up.
pub fn serve(listener: &TcpListener) -> io::Result<()> {
    for stream in listener.incoming() {
        let stream = stream?;
        tracing::info!(peer = ?stream.peer_addr().ok(), "host connected");
        if let Err(err) = serve_connection(stream) {
            tracing::warn!(%err, "session ended with error");
        }
    }
    Ok(())
}

fn serve_connection(stream: TcpStream) -> io::Result<()> {
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);
    let mut session = Session::new();
    for line in reader.lines() {
        let line = line?;
        let (reply, keep_open) = session.handle_line(line.trim_end());
        writer.write_all(reply.as_bytes())?;
        writer.flush()?;
        if !keep_open {
            break;
        }
    }
    Ok(())
}
