use std::collections::{hash_map::Entry, HashMap};

use anyhow::{bail, Context};
use chrono::{DateTime, TimeDelta, Utc};
use log::debug;

use crate::{
    flow_key::{self, FlowKey},
    flows::flow_state::FlowState,
    packet_record::PacketRecord,
};

/// Largest accepted idle timeout or expiration check interval, in seconds (100 years).
pub const MAX_TIMEOUT_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// All open flows of a capture session.
///
/// Without an idle timeout the table only grows. With one, flows that saw no
/// packet for longer than the timeout are evicted, checked at most once per
/// expiration check interval of packet time.
pub struct FlowTable {
    flow_map: HashMap<FlowKey, FlowState>,
    idle_timeout: Option<TimeDelta>,
    next_check_time: Option<DateTime<Utc>>, // Track the next time we check for flow expirations
    expiration_check_interval: TimeDelta,
    flows_created: u64,
    flows_evicted: u64,
}

impl FlowTable {
    /// Fails when a duration exceeds [`MAX_TIMEOUT_SECS`] or the idle timeout is 0.
    pub fn new(idle_timeout: Option<u64>, expiration_check_interval: u64) -> anyhow::Result<Self> {
        if idle_timeout == Some(0) {
            bail!("idle timeout must be at least 1s");
        }
        let idle_timeout = idle_timeout
            .map(|secs| seconds_delta(secs, "idle timeout"))
            .transpose()?;
        let expiration_check_interval =
            seconds_delta(expiration_check_interval, "expiration check interval")?;

        Ok(Self {
            flow_map: HashMap::new(),
            idle_timeout,
            next_check_time: None,
            expiration_check_interval,
            flows_created: 0,
            flows_evicted: 0,
        })
    }

    /// Resolves the key and direction of a packet against the open flows.
    pub fn resolve(&self, packet: &PacketRecord) -> (FlowKey, bool) {
        flow_key::resolve(packet, |key| self.contains(key))
    }

    /// Returns the flow stored under `key`, creating it from `packet` if absent.
    pub fn get_or_create(&mut self, key: &FlowKey, packet: &PacketRecord) -> &mut FlowState {
        match self.flow_map.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!("Creating new Flow: {}", key);
                self.flows_created += 1;
                entry.insert(FlowState::new(key.clone(), packet.timestamp))
            }
        }
    }

    /// Folds a packet into the flow stored under `key`, creating it if absent.
    pub fn update(&mut self, key: &FlowKey, packet: &PacketRecord, is_forward: bool) -> &FlowState {
        let flow = self.get_or_create(key, packet);
        flow.update(packet, is_forward);
        flow
    }

    /// Routes a packet to its flow and updates it.
    ///
    /// Returns the updated flow, and the flow it replaced when the packet hit
    /// a flow that had already been idle for longer than the timeout.
    pub fn process_packet(&mut self, packet: &PacketRecord) -> (&FlowState, Option<FlowState>) {
        let (mut key, mut is_forward) = self.resolve(packet);

        let mut expired = None;
        if self
            .get(&key)
            .is_some_and(|flow| self.is_idle(flow, packet.timestamp))
        {
            debug!("Flow expired: {}, Creating new Flow", key);
            expired = self.flow_map.remove(&key);
            self.flows_evicted += 1;
            (key, is_forward) = self.resolve(packet);
        }

        let flow = self.update(&key, packet, is_forward);
        (flow, expired)
    }

    /// Evicts idle flows if the next expiration check is due at `current_time`.
    pub fn check_and_evict_expired_flows(&mut self, current_time: DateTime<Utc>) -> Vec<FlowState> {
        if self.idle_timeout.is_none() {
            return Vec::new();
        }
        if self
            .next_check_time
            .is_some_and(|next_check| current_time < next_check)
        {
            return Vec::new();
        }

        let evicted = self.evict_expired_flows(current_time);
        self.next_check_time = Some(
            current_time
                .checked_add_signed(self.expiration_check_interval)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        debug!(
            "Next flow expiration check scheduled at: {:?}",
            self.next_check_time
        );
        evicted
    }

    /// Removes every flow that is idle at `current_time`, oldest first.
    pub fn evict_expired_flows(&mut self, current_time: DateTime<Utc>) -> Vec<FlowState> {
        let expired_keys: Vec<_> = self
            .flow_map
            .iter()
            .filter(|(_, flow)| self.is_idle(flow, current_time))
            .map(|(key, _)| key.clone())
            .collect();

        debug!("Evicting {} expired flows", expired_keys.len());
        let mut evicted: Vec<_> = expired_keys
            .iter()
            .filter_map(|key| self.flow_map.remove(key))
            .collect();
        self.flows_evicted += evicted.len() as u64;

        evicted.sort_by_key(|flow| flow.start_time);
        evicted
    }

    /// Removes all flows, in order of first packet arrival.
    pub fn drain(&mut self) -> Vec<FlowState> {
        let mut flows: Vec<_> = self.flow_map.drain().map(|(_, flow)| flow).collect();
        flows.sort_by_key(|flow| flow.start_time);
        flows
    }

    pub fn get(&self, key: &FlowKey) -> Option<&FlowState> {
        self.flow_map.get(key)
    }

    pub fn contains(&self, key: &FlowKey) -> bool {
        self.flow_map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.flow_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flow_map.is_empty()
    }

    pub fn flows_created(&self) -> u64 {
        self.flows_created
    }

    pub fn flows_evicted(&self) -> u64 {
        self.flows_evicted
    }

    fn is_idle(&self, flow: &FlowState, current_time: DateTime<Utc>) -> bool {
        self.idle_timeout
            .is_some_and(|timeout| current_time - flow.end_time > timeout)
    }
}

fn seconds_delta(secs: u64, name: &str) -> anyhow::Result<TimeDelta> {
    if secs > MAX_TIMEOUT_SECS {
        bail!("{} of {}s exceeds the maximum of {}s", name, secs, MAX_TIMEOUT_SECS);
    }
    let secs = i64::try_from(secs).with_context(|| format!("Invalid {}: {}s", name, secs))?;
    TimeDelta::try_seconds(secs).with_context(|| format!("Invalid {}: {}s", name, secs))
}
