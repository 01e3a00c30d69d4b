use std::{future::Future, io::Write};

use log::{debug, info};

use crate::{
    capture::PacketSource,
    flow_table::FlowTable,
    metrics::{snapshot_with, FeatureSnapshot, FinColumn},
    output::OutputWriter,
    packet_record::PacketRecord,
};

/// Counters of a finished capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub packets_processed: u64,
    pub rows_written: u64,
    pub flows_created: u64,
    pub flows_evicted: u64,
    /// Flows still open at shutdown. They are discarded, their rows are already written.
    pub flows_open: usize,
}

/// Per-packet pipeline: flow table update, snapshot, export.
pub struct Engine<W: Write> {
    flow_table: FlowTable,
    output: OutputWriter<W>,
    fin_column: FinColumn,
    packets_processed: u64,
}

impl<W: Write> Engine<W> {
    pub fn new(flow_table: FlowTable, output: OutputWriter<W>, fin_column: FinColumn) -> Self {
        Engine {
            flow_table,
            output,
            fin_column,
            packets_processed: 0,
        }
    }

    /// Processes one packet and appends the snapshot of its flow.
    ///
    /// A sink failure is returned to the caller, the packet still counts as
    /// applied to its flow.
    pub fn process_packet(&mut self, packet: &PacketRecord) -> anyhow::Result<FeatureSnapshot> {
        let evicted = self
            .flow_table
            .check_and_evict_expired_flows(packet.timestamp);
        let mut flush_needed = !evicted.is_empty();
        if flush_needed {
            debug!("Evicted {} idle flows", evicted.len());
        }

        let (flow, expired) = self.flow_table.process_packet(packet);
        flush_needed |= expired.is_some();
        let snapshot = snapshot_with(flow, self.fin_column);
        self.packets_processed += 1;

        self.output.write_snapshot(&snapshot)?;
        // Rows of evicted flows must be durable before their state is gone.
        if flush_needed {
            self.output.flush()?;
        }
        Ok(snapshot)
    }

    /// Pulls packets until the source ends or `shutdown` resolves.
    pub async fn run<F>(&mut self, source: &mut PacketSource, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Capturing packets... Press Ctrl-C to stop.");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Packet capture stopped.");
                    break;
                }
                packet = source.next_packet() => match packet {
                    Some(packet) => {
                        self.process_packet(&packet)?;
                    }
                    None => {
                        debug!("Packet source finished");
                        break;
                    }
                },
            }
        }
        Ok(())
    }

    /// Flushes the sink and discards the open flows.
    pub fn shutdown(&mut self) -> anyhow::Result<SessionSummary> {
        if !self.flow_table.is_empty() {
            debug!("Discarding {} open flows", self.flow_table.len());
        }
        let open_flows = self.flow_table.drain();
        self.output.flush_and_close()?;

        let summary = SessionSummary {
            packets_processed: self.packets_processed,
            rows_written: self.output.rows_written(),
            flows_created: self.flow_table.flows_created(),
            flows_evicted: self.flow_table.flows_evicted(),
            flows_open: open_flows.len(),
        };
        info!(
            "Processed {} packets into {} flows ({} evicted, {} open at shutdown), {} rows written",
            summary.packets_processed,
            summary.flows_created,
            summary.flows_evicted,
            summary.flows_open,
            summary.rows_written
        );
        Ok(summary)
    }

    pub fn flow_table(&self) -> &FlowTable {
        &self.flow_table
    }

    pub fn output(&self) -> &OutputWriter<W> {
        &self.output
    }
}
