use anywhere_core::{
    Classification, DispatchStrategy, DispatchTicket, Endpoint, ProxyMode, classify, route,
};

/// The request that currently owns the result slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub seq: u64,
    pub endpoint: Endpoint,
    pub input: String,
    pub classification: Classification,
}

/// Classification and endpoint for what a submit of `text` would send.
///
/// Submits trim their input, so this classifies the trimmed text. The
/// session view and the dispatcher both go through here.
pub fn resolve_route(
    text: &str,
    strategy: DispatchStrategy,
    mode: ProxyMode,
) -> (Classification, Endpoint) {
    let classification = classify(text.trim());
    (classification, route(classification, strategy, mode))
}

/// Hands out sequence numbers and remembers which one is authoritative.
#[derive(Debug, Clone, Default)]
pub struct ProxyDispatcher {
    last_seq: u64,
    in_flight: Option<InFlight>,
}

impl ProxyDispatcher {
    /// Start a request for `text`, or refuse.
    ///
    /// Refuses blank input, and a repeat of the request already in flight
    /// (same text, same endpoint). Anything else supersedes it.
    pub fn begin(
        &mut self,
        text: &str,
        strategy: DispatchStrategy,
        mode: ProxyMode,
    ) -> Option<DispatchTicket> {
        let input = text.trim();
        if input.is_empty() {
            return None;
        }
        let (classification, endpoint) = resolve_route(input, strategy, mode);
        if let Some(current) = &self.in_flight
            && current.input == input
            && current.endpoint == endpoint
        {
            return None;
        }

        self.last_seq = self.last_seq.saturating_add(1);
        let ticket = DispatchTicket {
            seq: self.last_seq,
            endpoint,
            input: input.to_string(),
            classification,
        };
        self.in_flight = Some(InFlight {
            seq: ticket.seq,
            endpoint,
            input: ticket.input.clone(),
            classification,
        });
        Some(ticket)
    }

    /// Claim the result slot for `seq`. `None` means the response is stale.
    pub fn settle(&mut self, seq: u64) -> Option<InFlight> {
        if self.in_flight.as_ref().map(|f| f.seq) != Some(seq) {
            return None;
        }
        self.in_flight.take()
    }

    /// Forget the in-flight request; its response will be dropped on arrival.
    pub fn abandon(&mut self) {
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECT: DispatchStrategy = DispatchStrategy::Direct;
    const STANDARD: ProxyMode = ProxyMode::Standard;

    #[test]
    fn blank_input_is_refused() {
        let mut d = ProxyDispatcher::default();
        assert!(d.begin("", DIRECT, STANDARD).is_none());
        assert!(d.begin("   \t", DIRECT, STANDARD).is_none());
        let next = d.begin("a.com", DIRECT, STANDARD).expect("ticket");
        assert_eq!(next.seq, 1);
    }

    #[test]
    fn ticket_uses_trimmed_input_and_its_classification() {
        let mut d = ProxyDispatcher::default();
        let ticket = d.begin("  reddit.com ", DIRECT, STANDARD).expect("ticket");
        assert_eq!(ticket.input, "reddit.com");
        assert_eq!(ticket.classification, Classification::Address);
        assert_eq!(ticket.endpoint, Endpoint::Proxy);
        assert_eq!(ticket.seq, 1);
    }

    #[test]
    fn sequence_numbers_increase() {
        let mut d = ProxyDispatcher::default();
        let first = d.begin("a.com", DIRECT, STANDARD).expect("first");
        let second = d.begin("b.com", DIRECT, STANDARD).expect("second");
        assert!(second.seq > first.seq);
    }

    #[test]
    fn repeat_while_in_flight_is_rejected() {
        let mut d = ProxyDispatcher::default();
        let first = d.begin("reddit.com", DIRECT, STANDARD).expect("first");
        assert!(d.begin("reddit.com ", DIRECT, STANDARD).is_none());

        let enhanced = d
            .begin("reddit.com", DIRECT, ProxyMode::Enhanced)
            .expect("different endpoint supersedes");
        assert_eq!(enhanced.endpoint, Endpoint::ProxyEnhanced);
        assert!(d.settle(first.seq).is_none());
        assert!(d.settle(enhanced.seq).is_some());
    }

    #[test]
    fn route_preview_matches_the_ticket() {
        for text in [" reddit.com", "reddit.com\t", "  best pizza  ", "www. "] {
            let mut d = ProxyDispatcher::default();
            let preview = resolve_route(text, DIRECT, STANDARD);
            let ticket = d.begin(text, DIRECT, STANDARD).expect("ticket");
            assert_eq!(preview, (ticket.classification, ticket.endpoint), "{text:?}");
        }
    }

    #[test]
    fn identical_text_after_settle_gets_a_new_seq() {
        let mut d = ProxyDispatcher::default();
        let first = d.begin("reddit.com", DIRECT, STANDARD).expect("first");
        assert!(d.settle(first.seq).is_some());
        let again = d.begin("reddit.com", DIRECT, STANDARD).expect("again");
        assert_ne!(first.seq, again.seq);
    }

    #[test]
    fn only_the_latest_seq_settles() {
        let mut d = ProxyDispatcher::default();
        let first = d.begin("a.com", DIRECT, STANDARD).expect("first");
        let second = d.begin("b.com", DIRECT, STANDARD).expect("second");

        assert!(d.settle(first.seq).is_none());
        let settled = d.settle(second.seq).expect("latest settles");
        assert_eq!(settled.input, "b.com");
        assert!(d.settle(second.seq).is_none());
    }

    #[test]
    fn abandoned_requests_never_settle() {
        let mut d = ProxyDispatcher::default();
        let ticket = d.begin("a.com", DIRECT, STANDARD).expect("ticket");
        d.abandon();
        assert!(d.settle(ticket.seq).is_none());
    }
}
