//! Live trade stream: a cancellable subscription over the exchange
//! WebSocket.
//!
//! The socket is read on a named background thread that pushes parsed
//! trades into a bounded queue; when the queue is full the trade is dropped
//! and counted rather than blocking the reader. Cancellation is a token
//! the reader observes between reads (the socket carries a short read
//! timeout so a quiet stream still notices it). There is no
//! reconnect-on-drop: a dropped connection ends the subscription with a
//! logged warning.

use crate::data::provider::DataError;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};

const QUEUE_CAPACITY: usize = 1024;
const READ_POLL: Duration = Duration::from_millis(500);

/// One executed trade from the live stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub price: f64,
    pub quantity: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
struct TradeEvent {
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    trade_time_ms: i64,
}

fn parse_trade(text: &str) -> Result<Trade, DataError> {
    let event: TradeEvent = serde_json::from_str(text)
        .map_err(|e| DataError::Stream(format!("unparsable trade message: {e}")))?;
    let price = event
        .price
        .parse::<f64>()
        .map_err(|_| DataError::Stream(format!("non-numeric price: {:?}", event.price)))?;
    let quantity = event
        .quantity
        .parse::<f64>()
        .map_err(|_| DataError::Stream(format!("non-numeric quantity: {:?}", event.quantity)))?;
    let timestamp = DateTime::from_timestamp_millis(event.trade_time_ms)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            DataError::Stream(format!("invalid trade time: {}", event.trade_time_ms))
        })?;
    Ok(Trade {
        price,
        quantity,
        timestamp,
    })
}

/// Push a trade into the bounded queue. Returns `false` when the receiver
/// is gone and the reader should shut down.
fn deliver(tx: &SyncSender<Trade>, trade: Trade, dropped: &AtomicU64) -> bool {
    match tx.try_send(trade) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            dropped.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

fn reader_loop(
    mut socket: WebSocket<MaybeTlsStream<TcpStream>>,
    tx: SyncSender<Trade>,
    cancel: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) {
    loop {
        if cancel.load(Ordering::Relaxed) {
            let _ = socket.close(None);
            break;
        }
        match socket.read() {
            Ok(Message::Text(text)) => match parse_trade(&text) {
                Ok(trade) => {
                    if !deliver(&tx, trade, &dropped) {
                        let _ = socket.close(None);
                        break;
                    }
                }
                Err(e) => debug!(error = %e, "skipping stream message"),
            },
            Ok(Message::Close(frame)) => {
                warn!(?frame, "trade stream closed by server");
                break;
            }
            // remaining control frames are handled by the socket itself
            Ok(_) => {}
            Err(WsError::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(e) => {
                warn!(error = %e, "trade stream connection ended");
                break;
            }
        }
    }
}

/// Connects trade subscriptions against a WebSocket endpoint.
pub struct TradeStream {
    ws_url: String,
}

impl TradeStream {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    /// Open the `<symbol>@trade` stream and start the reader thread.
    pub fn subscribe(&self, symbol: &str) -> Result<TradeSubscription, DataError> {
        let symbol = symbol.to_lowercase();
        let url = format!("{}/{symbol}@trade", self.ws_url);
        let (socket, _response) =
            tungstenite::connect(url.as_str()).map_err(|e| DataError::Stream(e.to_string()))?;

        // A short read timeout lets the reader observe cancellation even
        // when the stream is quiet.
        match socket.get_ref() {
            MaybeTlsStream::Plain(stream) => {
                let _ = stream.set_read_timeout(Some(READ_POLL));
            }
            MaybeTlsStream::Rustls(tls) => {
                let _ = tls.get_ref().set_read_timeout(Some(READ_POLL));
            }
            _ => {}
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::sync_channel(QUEUE_CAPACITY);

        let reader_cancel = Arc::clone(&cancel);
        let reader_dropped = Arc::clone(&dropped);
        let handle = std::thread::Builder::new()
            .name(format!("trade-stream-{symbol}"))
            .spawn(move || reader_loop(socket, tx, reader_cancel, reader_dropped))
            .map_err(|e| DataError::Stream(format!("spawn reader: {e}")))?;

        Ok(TradeSubscription {
            rx,
            cancel,
            dropped,
            handle: Some(handle),
        })
    }
}

/// Handle to a live trade subscription: a bounded queue of trades plus the
/// cancellation token for the reader thread.
pub struct TradeSubscription {
    rx: Receiver<Trade>,
    cancel: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl TradeSubscription {
    /// Next queued trade, if any.
    pub fn try_next(&self) -> Option<Trade> {
        self.rx.try_recv().ok()
    }

    /// Block up to `timeout` for the next trade.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Trade> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Trades discarded because the queue was full.
    pub fn dropped_trades(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Cancel the subscription and wait for the reader to exit.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TradeSubscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_trade_message() {
        let text = r#"{"e":"trade","E":1700000001000,"s":"BTCUSDT",
            "t":12345,"p":"42350.10","q":"0.0051","T":1700000000500,"m":true,"M":true}"#;
        let trade = parse_trade(text).unwrap();
        assert_eq!(trade.price, 42350.10);
        assert_eq!(trade.quantity, 0.0051);
        assert_eq!(
            trade.timestamp,
            DateTime::from_timestamp_millis(1_700_000_000_500)
                .unwrap()
                .naive_utc()
        );
    }

    #[test]
    fn rejects_malformed_messages() {
        assert!(parse_trade("not json").is_err());
        assert!(parse_trade(r#"{"p":"abc","q":"1","T":1}"#).is_err());
    }

    #[test]
    fn deliver_drops_when_the_queue_is_full() {
        let (tx, rx) = mpsc::sync_channel(1);
        let dropped = AtomicU64::new(0);
        let trade = Trade {
            price: 1.0,
            quantity: 1.0,
            timestamp: DateTime::from_timestamp_millis(0).unwrap().naive_utc(),
        };

        assert!(deliver(&tx, trade.clone(), &dropped));
        assert!(deliver(&tx, trade.clone(), &dropped)); // full → dropped
        assert_eq!(dropped.load(Ordering::Relaxed), 1);
        assert_eq!(rx.try_recv().unwrap(), trade);

        drop(rx);
        assert!(!deliver(&tx, trade, &dropped)); // receiver gone
    }
}
