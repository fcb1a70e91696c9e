//! Logical address allocation by <Polling Message> (CEC 10.2.1).

use crate::cec_types::LogicalAddress;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Step {
    /// Poll this address next.
    Probe(LogicalAddress),
    /// Allocation done with this address.
    Claim(LogicalAddress),
}

/// Walks a device type's candidate list front to back, one probe result at a
/// time.
pub(crate) struct Allocator {
    candidates: &'static [LogicalAddress],
    next: usize,
    probing: bool,
}

impl Allocator {
    pub const fn new() -> Self {
        Self {
            candidates: &[],
            next: 0,
            probing: false,
        }
    }

    /// First probe target, or `None` when the list offers nothing to probe.
    pub fn start(&mut self, candidates: &'static [LogicalAddress]) -> Option<LogicalAddress> {
        self.candidates = candidates;
        self.next = 0;
        self.probing = false;
        match self.current() {
            Some(first) if first != LogicalAddress::UNREGISTERED => {
                self.probing = true;
                Some(first)
            }
            _ => None,
        }
    }

    pub fn is_probing(&self) -> bool {
        self.probing
    }

    fn current(&self) -> Option<LogicalAddress> {
        self.candidates.get(self.next).copied()
    }

    /// Feeds back whether the probe of the current candidate was
    /// acknowledged, i.e. whether somebody already owns it.
    pub fn probe_result(&mut self, acked: bool) -> Option<Step> {
        if !self.probing {
            return None;
        }
        let current = self.current()?;
        if !acked {
            self.probing = false;
            return Some(Step::Claim(current));
        }
        self.next += 1;
        match self.current() {
            Some(next) if next != LogicalAddress::UNREGISTERED => Some(Step::Probe(next)),
            _ => {
                self.probing = false;
                Some(Step::Claim(LogicalAddress::UNREGISTERED))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cec_types::CecDeviceType;

    #[test]
    fn claims_first_silent_candidate() {
        let mut allocator = Allocator::new();
        let first = allocator.start(CecDeviceType::PLAYBACK_DEVICE.candidate_addresses());
        assert_eq!(first, Some(LogicalAddress::PLAYBACK_DEVICE_1));
        assert_eq!(
            allocator.probe_result(true),
            Some(Step::Probe(LogicalAddress::PLAYBACK_DEVICE_2))
        );
        assert_eq!(
            allocator.probe_result(false),
            Some(Step::Claim(LogicalAddress::PLAYBACK_DEVICE_2))
        );
        assert!(!allocator.is_probing());
        assert_eq!(allocator.probe_result(false), None);
    }

    #[test]
    fn falls_back_to_unregistered_without_probing_it() {
        let mut allocator = Allocator::new();
        allocator.start(CecDeviceType::TV.candidate_addresses());
        assert_eq!(
            allocator.probe_result(true),
            Some(Step::Probe(LogicalAddress::FREE_USE))
        );
        assert_eq!(
            allocator.probe_result(true),
            Some(Step::Claim(LogicalAddress::UNREGISTERED))
        );
        assert_eq!(allocator.probe_result(true), None);
    }

    #[test]
    fn nothing_to_probe_for_empty_lists() {
        let mut allocator = Allocator::new();
        assert_eq!(allocator.start(&[]), None);
        assert!(!allocator.is_probing());
        assert_eq!(allocator.probe_result(false), None);
    }
}
