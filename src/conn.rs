//! # Connection Handler
//!
//! Handles multiple successive requests from the same connection.
//!
//! Since a single request is always an array, it can contain multiple commands. This is called
//! [pipelining](https://redis.io/docs/latest/develop/reference/protocol-spec/#multiple-commands-and-pipelining).
//! Pipelining enables clients to send multiple commands at once and wait for replies later. A
//! client can use the same connection to issue multiple commands without waiting for each
//! reply before sending the next.

use crate::cmd::dispatch;
use crate::constants::BUFFER_LEN;
use crate::errors::ConnectionError;
use crate::resp::{decode, encode};
use crate::storage::Store;
use log::{debug, trace};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Drives one client connection until EOF or a transport/protocol error.
///
/// Maintains an append-only read buffer and repeatedly decodes as many complete frames as have
/// arrived, dispatching and writing a reply for each in request order before reading again.
/// Replies are written one frame at a time, in the order requests arrived, so pipelined commands
/// never reply out of order.
///
/// A [`ConnectionError`] here is not fatal to the server: the caller logs it and moves on.
pub async fn handle_connection(mut stream: TcpStream, store: Store) -> Result<(), ConnectionError> {
    let peer_addr = stream.peer_addr()?;
    debug!("Start handling requests from {peer_addr}");

    let mut buf: Vec<u8> = Vec::with_capacity(BUFFER_LEN);
    let mut chunk = [0u8; BUFFER_LEN];
    let mut consumed = 0usize;

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        loop {
            let (frame, used) = decode(&buf[consumed..])?;
            let Some(frame) = frame else {
                break;
            };
            trace!("dispatching frame from {peer_addr}: {frame:?}");
            let response = dispatch(&frame, &store);
            stream.write_all(&encode(&response)).await?;
            stream.flush().await?;
            consumed += used;
        }

        // Compact the buffer once it has fully drained, so it doesn't grow without bound across
        // a long-lived, low-traffic connection.
        if consumed == buf.len() {
            buf.clear();
            consumed = 0;
        } else if consumed > 0 {
            buf.drain(..consumed);
            consumed = 0;
        }
    }

    debug!("Stop handling requests from {peer_addr}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn ping_pong_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Store::new();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            handle_connection(socket, store).await.unwrap();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+PONG\r\n");

        drop(client);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fragmented_request_across_reads_is_handled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Store::new();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            handle_connection(socket, store).await.unwrap();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let whole = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n";
        let (first, second) = whole.split_at(10);
        client.write_all(first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.write_all(second).await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+OK\r\n");

        drop(client);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn set_with_ex_then_read_back_null_after_expiry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Store::new();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            handle_connection(socket, store).await.unwrap();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*5\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nPX\r\n$2\r\n20\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"+OK\r\n");

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
            .await
            .unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"$-1\r\n");

        drop(client);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn many_concurrent_clients_incrementing_the_same_key() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Store::new();

        let server = tokio::spawn(async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                let store = store.clone();
                tokio::spawn(handle_connection(socket, store));
            }
        });

        const CLIENTS: usize = 100;
        const INCREMENTS_PER_CLIENT: usize = 10;

        let mut handles = Vec::with_capacity(CLIENTS);
        for _ in 0..CLIENTS {
            handles.push(tokio::spawn(async move {
                let mut client = TcpStream::connect(addr).await.unwrap();
                let mut buf = [0u8; 64];
                for _ in 0..INCREMENTS_PER_CLIENT {
                    client
                        .write_all(b"*2\r\n$4\r\nINCR\r\n$1\r\nc\r\n")
                        .await
                        .unwrap();
                    client.read(&mut buf).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nc\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        let total = (CLIENTS * INCREMENTS_PER_CLIENT).to_string();
        let expected = format!("${}\r\n{total}\r\n", total.len());
        assert_eq!(&buf[..n], expected.as_bytes());

        server.abort();
    }
}
