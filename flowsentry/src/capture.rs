use std::{
    fs::File,
    io::Read,
    net::IpAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use log::{debug, error, info, warn};
use pcap::{Activated, Capture};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    decode::{Decoder, LinkLayer},
    packet_record::{timestamp_from_micros, PacketRecord, TcpFlags, TransportProtocol},
};

/// Packets buffered between the capture thread and the engine.
const BUFFER_NUM_PACKETS: usize = 10_000;

/// Read timeout of a live capture, bounds how long a stop request waits.
const LIVE_READ_TIMEOUT_MS: i32 = 100;

/// Counters reported by a capture thread when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames or rows read from the source.
    pub received: u64,
    /// Records handed to the engine.
    pub forwarded: u64,
    /// Frames or rows dropped by the IP/TCP filter.
    pub filtered: u64,
}

/// A live, non-restartable stream of decoded packets.
///
/// The blocking read runs on its own thread and feeds a bounded channel.
/// Dropping or closing the source stops that thread.
pub struct PacketSource {
    receiver: mpsc::Receiver<PacketRecord>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<anyhow::Result<CaptureStats>>>,
}

impl PacketSource {
    /// Captures from a network interface.
    pub fn live(interface: &str, include_udp: bool) -> anyhow::Result<Self> {
        debug!("Opening interface {} ...", interface);
        let capture = Capture::from_device(interface)
            .with_context(|| format!("Failed to find interface {}", interface))?
            .promisc(true)
            .immediate_mode(true)
            .timeout(LIVE_READ_TIMEOUT_MS)
            .open()
            .with_context(|| format!("Failed to open interface {}", interface))?;
        info!("Interface {} successfully opened", interface);
        Self::from_capture(capture, include_udp)
    }

    /// Replays a pcap savefile.
    pub fn pcap_file(path: &str, include_udp: bool) -> anyhow::Result<Self> {
        debug!("Opening the pcap file: {:?} ...", path);
        let capture = Capture::from_file(path)
            .with_context(|| format!("Failed to open pcap file {}", path))?;
        Self::from_capture(capture, include_udp)
    }

    /// Replays a CSV file of already decoded packets.
    pub fn replay(path: &str, include_udp: bool) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
        let mut reader = ReplayReader::new(file, include_udp);
        Ok(Self::spawn("replay", move |running, sender| {
            let mut stats = CaptureStats::default();
            while running.load(Ordering::Relaxed) {
                match reader.next_record()? {
                    Some(record) => {
                        if sender.blocking_send(record).is_err() {
                            break;
                        }
                        stats.forwarded += 1;
                    }
                    None => break,
                }
            }
            stats.received = reader.rows_read();
            stats.filtered = reader.rows_filtered();
            Ok(stats)
        }))
    }

    /// Serves a fixed list of records, then ends.
    pub fn from_records(records: Vec<PacketRecord>) -> Self {
        Self::spawn("records", move |running, sender| {
            let mut stats = CaptureStats::default();
            for record in records {
                if !running.load(Ordering::Relaxed) || sender.blocking_send(record).is_err() {
                    break;
                }
                stats.received += 1;
                stats.forwarded += 1;
            }
            Ok(stats)
        })
    }

    fn from_capture<T>(mut capture: Capture<T>, include_udp: bool) -> anyhow::Result<Self>
    where
        T: Activated + Send + 'static,
    {
        let dlt = capture.get_datalink().0;
        let link_layer = LinkLayer::from_dlt(dlt)
            .ok_or_else(|| anyhow!("Unsupported link type (DLT {})", dlt))?;
        let decoder = Decoder::new(link_layer, include_udp);

        Ok(Self::spawn("pcap", move |running, sender| {
            let mut stats = CaptureStats::default();
            while running.load(Ordering::Relaxed) {
                let packet = match capture.next_packet() {
                    Ok(packet) => packet,
                    Err(pcap::Error::TimeoutExpired) => continue,
                    Err(pcap::Error::NoMorePackets) => break,
                    Err(e) => {
                        error!("Error capturing packet: {}", e);
                        return Err(e).context("Packet capture failed");
                    }
                };
                stats.received += 1;

                let timestamp = timestamp_from_micros(
                    packet.header.ts.tv_sec as i64 * 1_000_000 + packet.header.ts.tv_usec as i64,
                );
                let record = timestamp.and_then(|timestamp| {
                    decoder.decode(packet.data, timestamp, packet.header.len)
                });
                match record {
                    Some(record) => {
                        if sender.blocking_send(record).is_err() {
                            break;
                        }
                        stats.forwarded += 1;
                    }
                    None => stats.filtered += 1,
                }
            }
            Ok(stats)
        }))
    }

    fn spawn<F>(name: &str, body: F) -> Self
    where
        F: FnOnce(&AtomicBool, &mpsc::Sender<PacketRecord>) -> anyhow::Result<CaptureStats>
            + Send
            + 'static,
    {
        let (sender, receiver) = mpsc::channel(BUFFER_NUM_PACKETS);
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let name = name.to_string();

        let handle = thread::spawn(move || {
            debug!("{} capture thread started", name);
            let result = body(&thread_running, &sender);
            debug!("{} capture thread exiting", name);
            result
        });

        PacketSource {
            receiver,
            running,
            handle: Some(handle),
        }
    }

    /// Waits for the next packet. `None` once the source is exhausted or failed.
    pub async fn next_packet(&mut self) -> Option<PacketRecord> {
        self.receiver.recv().await
    }

    /// Stops the capture thread and releases the capture handle.
    pub fn close(mut self) -> anyhow::Result<CaptureStats> {
        self.stop()
    }

    fn stop(&mut self) -> anyhow::Result<CaptureStats> {
        self.running.store(false, Ordering::Relaxed);
        // Unblocks a thread waiting for channel capacity.
        self.receiver.close();

        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("Capture thread panicked"))?,
            None => Ok(CaptureStats::default()),
        }
    }
}

impl Drop for PacketSource {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.stop() {
                error!("Error releasing packet source: {:?}", e);
            }
        }
    }
}

/// One row of a replay file.
#[derive(Debug, Deserialize)]
struct ReplayRow {
    timestamp: f64,
    src_ip: String,
    src_port: u16,
    dst_ip: String,
    dst_port: u16,
    protocol: String,
    length: u32,
    /// Absent column or empty cell reads as 0, like the flags.
    #[serde(default)]
    tcp_header_length: Option<u32>,
    #[serde(default)]
    syn: String,
    #[serde(default)]
    psh: String,
    #[serde(default)]
    rst: String,
    #[serde(default)]
    ack: String,
    #[serde(default)]
    urg: String,
    #[serde(default)]
    fin: String,
}

/// Reads decoded packets from CSV, applying the same IP/TCP filter as live capture.
pub struct ReplayReader<R: Read> {
    records: csv::DeserializeRecordsIntoIter<R, ReplayRow>,
    include_udp: bool,
    rows_read: u64,
    rows_filtered: u64,
}

impl<R: Read> ReplayReader<R> {
    pub fn new(reader: R, include_udp: bool) -> Self {
        let records = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader)
            .into_deserialize();
        ReplayReader {
            records,
            include_udp,
            rows_read: 0,
            rows_filtered: 0,
        }
    }

    /// Returns the next admissible record.
    ///
    /// Malformed rows are skipped with a warning, read failures are errors.
    pub fn next_record(&mut self) -> anyhow::Result<Option<PacketRecord>> {
        for row in self.records.by_ref() {
            self.rows_read += 1;
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => {
                    return Err(e).context("Failed to read replay file");
                }
                Err(e) => {
                    warn!("Skipping malformed replay row: {}", e);
                    self.rows_filtered += 1;
                    continue;
                }
            };
            match packet_from_row(&row, self.include_udp) {
                Some(record) => return Ok(Some(record)),
                None => self.rows_filtered += 1,
            }
        }
        Ok(None)
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn rows_filtered(&self) -> u64 {
        self.rows_filtered
    }
}

/// Reads a flag field. Anything that is not an integer counts as unset.
pub fn parse_flag(value: &str) -> i64 {
    value.trim().parse::<i64>().unwrap_or(0)
}

fn packet_from_row(row: &ReplayRow, include_udp: bool) -> Option<PacketRecord> {
    let timestamp = replay_timestamp(row.timestamp)?;
    let source_ip: IpAddr = row.src_ip.parse().ok()?;
    let destination_ip: IpAddr = row.dst_ip.parse().ok()?;

    match TransportProtocol::parse(&row.protocol)? {
        TransportProtocol::Tcp => {
            let flags = TcpFlags {
                fin: parse_flag(&row.fin) == 1,
                syn: parse_flag(&row.syn) == 1,
                rst: parse_flag(&row.rst) == 1,
                psh: parse_flag(&row.psh) == 1,
                ack: parse_flag(&row.ack) == 1,
                urg: parse_flag(&row.urg) == 1,
            };
            Some(PacketRecord::tcp(
                timestamp,
                (source_ip, row.src_port),
                (destination_ip, row.dst_port),
                row.length,
                row.tcp_header_length.unwrap_or(0),
                flags,
            ))
        }
        TransportProtocol::Udp if include_udp => Some(PacketRecord::udp(
            timestamp,
            (source_ip, row.src_port),
            (destination_ip, row.dst_port),
            row.length,
        )),
        TransportProtocol::Udp => None,
    }
}

fn replay_timestamp(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    timestamp_from_micros((seconds * 1_000_000.0).round() as i64)
}
