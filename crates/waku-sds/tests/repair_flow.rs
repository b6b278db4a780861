//! Multi-participant repair scenarios.
//!
//! Participants exchange messages directly; "the wire" is the test body.

use waku_sds::{Message, RepairConfig};
use waku_sds_testkit::{multi_party_fixtures, Participant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn deliver(to: &mut [&mut Participant], message: &Message, now: u64) {
    for p in to.iter_mut() {
        p.receive(message, now).unwrap();
    }
}

#[test]
fn test_lost_message_repaired_by_sender() {
    init_tracing();
    let mut parties = multi_party_fixtures(3, "chat", RepairConfig::default()).unwrap();
    let [p0, p1, p2] = &mut parties[..] else {
        panic!("expected three participants");
    };

    let m1 = p0.send(b"first", 0).unwrap();
    let m2 = p0.send(b"second", 0).unwrap();

    deliver(&mut [&mut *p1], &m1, 0);
    deliver(&mut [&mut *p1, &mut *p2], &m2, 0);

    // p2 never saw m1.
    assert!(!p2.has(m1.message_id()));
    assert!(p2.repair.is_pending_request(m1.message_id()));
    let t_req = p2.repair.next_request_time().unwrap();
    assert!((30_000..120_000).contains(&t_req));

    // Nothing is due before t_req.
    assert!(p2.tick(t_req - 1).requests.is_empty());

    let outbox = p2.tick(t_req);
    assert_eq!(outbox.requests.len(), 1);
    assert_eq!(outbox.requests[0].message_id, *m1.message_id());
    assert_eq!(outbox.requests[0].sender_id.as_ref(), Some(&p0.id));

    let request = p2.repair_request_message(outbox.requests);
    deliver(&mut [&mut *p0, &mut *p1], &request, t_req);

    // The original sender is at distance zero and answers immediately.
    assert_eq!(p0.repair.next_response_time(), Some(t_req));
    assert!(p1.repair.is_pending_response(m1.message_id()));

    let responses = p0.tick(t_req).responses;
    assert_eq!(responses, vec![m1.clone()]);

    deliver(&mut [&mut *p1, &mut *p2], &responses[0], t_req);

    assert!(p2.has(m1.message_id()));
    assert!(!p2.repair.has_pending_requests());
    // p1 saw the rebroadcast and stands down.
    assert!(!p1.repair.is_pending_response(m1.message_id()));
    assert!(p1.tick(t_req + 120_000).responses.is_empty());

    assert_eq!(p0.repair.stats().responses_sent, 1);
    assert_eq!(p2.repair.stats().requests_queued, 1);
}

#[test]
fn test_request_suppresses_duplicate_requests() {
    init_tracing();
    let mut parties = multi_party_fixtures(3, "chat", RepairConfig::default()).unwrap();
    let [p0, p1, p2] = &mut parties[..] else {
        panic!("expected three participants");
    };

    let m1 = p0.send(b"first", 0).unwrap();
    let m2 = p0.send(b"second", 0).unwrap();
    deliver(&mut [&mut *p1, &mut *p2], &m2, 0);

    assert!(p1.repair.is_pending_request(m1.message_id()));
    assert!(p2.repair.is_pending_request(m1.message_id()));

    let t1 = p1.repair.next_request_time().unwrap();
    let t2 = p2.repair.next_request_time().unwrap();
    let (first, second) = if t1 <= t2 { (p1, p2) } else { (p2, p1) };
    let t = t1.min(t2);

    let requests = first.tick(t).requests;
    assert_eq!(requests.len(), 1);
    let request = first.repair_request_message(requests);
    second.receive(&request, t).unwrap();

    // Someone else asked; no need to ask again.
    assert!(!second.repair.is_pending_request(m1.message_id()));
    assert!(first.repair.is_pending_request(m1.message_id()));
}

#[test]
fn test_repair_request_piggybacks_on_content() {
    init_tracing();
    let mut parties = multi_party_fixtures(2, "chat", RepairConfig::default()).unwrap();
    let [p0, p1] = &mut parties[..] else {
        panic!("expected two participants");
    };

    let m1 = p0.send(b"first", 0).unwrap();
    let m2 = p0.send(b"second", 0).unwrap();
    deliver(&mut [&mut *p1], &m2, 0);

    let t_req = p1.repair.next_request_time().unwrap();
    let reply = p1.send(b"reply", t_req).unwrap();
    assert_eq!(reply.header.repair_request.len(), 1);
    assert_eq!(reply.header.repair_request[0].message_id, *m1.message_id());

    p0.receive(&reply, t_req).unwrap();
    assert!(p0.repair.is_pending_response(m1.message_id()));
    assert!(p0.has(reply.message_id()));
}

#[test]
fn test_unknown_message_not_answered() {
    init_tracing();
    let mut parties = multi_party_fixtures(3, "chat", RepairConfig::default()).unwrap();
    let [p0, p1, p2] = &mut parties[..] else {
        panic!("expected three participants");
    };

    let m1 = p0.send(b"first", 0).unwrap();
    let m2 = p0.send(b"second", 0).unwrap();
    // Neither p1 nor p2 holds m1.
    deliver(&mut [&mut *p1, &mut *p2], &m2, 0);

    let t_req = p2.repair.next_request_time().unwrap();
    let requests = p2.tick(t_req).requests;
    let request = p2.repair_request_message(requests);
    p1.receive(&request, t_req).unwrap();

    assert!(!p1.repair.is_pending_response(m1.message_id()));
    assert_eq!(p1.repair.pending_response_count(), 0);
}

#[test]
fn test_disabled_repair_is_inert() {
    init_tracing();
    let config = RepairConfig {
        enabled: false,
        ..Default::default()
    };
    let mut parties = multi_party_fixtures(2, "chat", config).unwrap();
    let [p0, p1] = &mut parties[..] else {
        panic!("expected two participants");
    };

    let _m1 = p0.send(b"first", 0).unwrap();
    let m2 = p0.send(b"second", 0).unwrap();

    let missing = p1.receive(&m2, 0).unwrap();
    assert_eq!(missing.len(), 1);
    assert!(!p1.repair.has_pending_requests());
    assert!(p1.tick(u64::MAX).requests.is_empty());
}

#[test]
fn test_other_channels_ignored() {
    init_tracing();
    let mut a = Participant::new("alice", "chat", RepairConfig::default()).unwrap();
    let mut b = Participant::new("bob", "other", RepairConfig::default()).unwrap();

    let _ = a.send(b"first", 0).unwrap();
    let m2 = a.send(b"second", 0).unwrap();

    assert!(b.receive(&m2, 0).unwrap().is_empty());
    assert!(!b.has(m2.message_id()));
    assert!(!b.repair.has_pending_requests());
}
