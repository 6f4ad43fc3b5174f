//! TCP client
//!
//! Blocking client for the binary protocol, used by the CLI.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{KvError, Result};
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// Connection to a tlogkv TCP frontend
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one command and wait for its response
    pub fn request(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Fetch a value; `Ok(None)` when the key is absent
    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        let response = self.request(&Command::Get {
            key: key.to_string(),
        })?;
        match response.status {
            Status::Ok => Ok(Some(response.payload.unwrap_or_default())),
            Status::NotFound => Ok(None),
            _ => Err(remote_error(response)),
        }
    }

    pub fn put(&mut self, key: &str, value: &str) -> Result<()> {
        let response = self.request(&Command::Put {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        expect_success(response)
    }

    pub fn delete(&mut self, key: &str) -> Result<()> {
        let response = self.request(&Command::Delete {
            key: key.to_string(),
        })?;
        expect_success(response)
    }

    pub fn ping(&mut self) -> Result<()> {
        expect_success(self.request(&Command::Ping)?)
    }
}

fn expect_success(response: Response) -> Result<()> {
    if response.status.is_success() {
        Ok(())
    } else {
        Err(remote_error(response))
    }
}

fn remote_error(response: Response) -> KvError {
    let message = response
        .payload
        .unwrap_or_else(|| format!("{:?}", response.status));
    match response.status {
        Status::BadRequest => KvError::InvalidInput(message),
        _ => KvError::Protocol(format!("server error: {}", message)),
    }
}
