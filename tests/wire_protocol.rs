use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};

use allot::engine::Engine;
use allot::provision::Provision;
use allot::wire;

// ── Test infrastructure ──────────────────────────────────────

const PROVISION: &str = r#"{
    "zones": [
        {"id": 1, "name": "A", "class": "priority", "capacity": 100, "utilization": 50},
        {"id": 2, "name": "B", "class": "standard", "capacity": 1},
        {"id": 3, "name": "C", "class": "economy", "capacity": 200, "utilization": 10}
    ],
    "slots": [
        {"id": 1, "start": "09:00:00", "end": "09:30:00", "capacity": 2},
        {"id": 2, "start": "09:30:00", "end": "10:00:00", "capacity": 10}
    ],
    "staff": [1, 2, 3]
}"#;

async fn start_test_server() -> (SocketAddr, Arc<Engine>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let engine = Arc::new(Provision::from_json(PROVISION).unwrap().into_engine().unwrap());

    let engine2 = engine.clone();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let engine = engine2.clone();
            tokio::spawn(async move {
                let _ = wire::process_connection(socket, engine).await;
            });
        }
    });

    (addr, engine)
}

struct Client {
    framed: Framed<TcpStream, LinesCodec>,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            framed: Framed::new(stream, LinesCodec::new()),
        }
    }

    async fn send_raw(&mut self, line: &str) -> Value {
        self.framed.send(line.to_string()).await.unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(5), self.framed.next())
            .await
            .expect("reply timed out")
            .expect("connection closed")
            .unwrap();
        serde_json::from_str(&reply).unwrap()
    }

    async fn call(&mut self, req: Value) -> Value {
        self.send_raw(&req.to_string()).await
    }

    /// Call and unwrap an ok reply's `result`.
    async fn ok(&mut self, req: Value) -> Value {
        let reply = self.call(req).await;
        assert_eq!(reply["status"], "ok", "unexpected reply: {reply}");
        reply["result"].clone()
    }

    /// Call and return an error reply's `code`.
    async fn err(&mut self, req: Value) -> String {
        let reply = self.call(req).await;
        assert_eq!(reply["status"], "error", "unexpected reply: {reply}");
        reply["code"].as_str().unwrap().to_string()
    }
}

fn place(priority: &str) -> Value {
    json!({
        "op": "place_order",
        "customer_id": 42,
        "amount_cents": 1999,
        "priority": priority,
        "items": [{"item_id": 7, "quantity": 2}]
    })
}

fn zone_utilization(zones: &Value, id: u64) -> u64 {
    zones["zones"]
        .as_array()
        .unwrap()
        .iter()
        .find(|z| z["id"] == id)
        .unwrap()["utilization"]
        .as_u64()
        .unwrap()
}

// ── Orders ───────────────────────────────────────────────────

#[tokio::test]
async fn order_lifecycle_over_tcp() {
    let (addr, _engine) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    let order = client.ok(place("high")).await;
    assert_eq!(order["kind"], "order");
    assert_eq!(order["zone_id"], 1);
    assert_eq!(order["status"], "preparing");
    assert_eq!(order["items"][0]["quantity"], 2);
    let order_id = order["id"].as_str().unwrap().to_string();

    let zones = client.ok(json!({"op": "list_zones"})).await;
    assert_eq!(zone_utilization(&zones, 1), 51);

    let ready = client
        .ok(json!({"op": "update_order_status", "order_id": order_id, "status": "ready_for_pickup"}))
        .await;
    assert_eq!(ready["status"], "ready_for_pickup");

    let done = client
        .ok(json!({"op": "update_order_status", "order_id": order_id, "status": "completed"}))
        .await;
    assert_eq!(done["status"], "completed");
    let zones = client.ok(json!({"op": "list_zones"})).await;
    assert_eq!(zone_utilization(&zones, 1), 50);

    // Repeating the completion changes nothing.
    client
        .ok(json!({"op": "update_order_status", "order_id": order_id, "status": "completed"}))
        .await;
    let zones = client.ok(json!({"op": "list_zones"})).await;
    assert_eq!(zone_utilization(&zones, 1), 50);

    let code = client
        .err(json!({"op": "update_order_status", "order_id": order_id, "status": "preparing"}))
        .await;
    assert_eq!(code, "invalid_transition");

    let fetched = client.ok(json!({"op": "get_order", "order_id": order_id})).await;
    assert_eq!(fetched["status"], "completed");
}

#[tokio::test]
async fn exhausted_tier_is_reported() {
    let (addr, _engine) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    client.ok(place("medium")).await;
    assert_eq!(client.err(place("medium")).await, "capacity_exhausted");
    let zones = client.ok(json!({"op": "list_zones"})).await;
    assert_eq!(zone_utilization(&zones, 2), 1);
}

#[tokio::test]
async fn unknown_order_is_reported() {
    let (addr, _engine) = start_test_server().await;
    let mut client = Client::connect(addr).await;
    let code = client
        .err(json!({"op": "get_order", "order_id": "01ARZ3NDEKTSV4RRFFQ69G5FAV"}))
        .await;
    assert_eq!(code, "no_such_order");
}

// ── Appointments ─────────────────────────────────────────────

#[tokio::test]
async fn appointment_booking_over_tcp() {
    let (addr, engine) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    let a = client
        .ok(json!({"op": "schedule_appointment", "appointment_id": 1, "slot_id": 1, "staff_id": 1}))
        .await;
    assert_eq!(a["kind"], "assignment");
    assert_eq!(a["slot_id"], 1);
    client
        .ok(json!({"op": "schedule_appointment", "appointment_id": 2, "slot_id": 1, "staff_id": 2}))
        .await;

    let code = client
        .err(json!({"op": "schedule_appointment", "appointment_id": 3, "slot_id": 1, "staff_id": 3}))
        .await;
    assert_eq!(code, "slot_full");

    let open = client.ok(json!({"op": "list_slots", "open_only": true})).await;
    let open_ids: Vec<u64> = open["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_u64().unwrap())
        .collect();
    assert_eq!(open_ids, vec![2]);

    let assignment_id = a["id"].as_str().unwrap().to_string();
    let fetched = client
        .ok(json!({"op": "get_assignment", "assignment_id": assignment_id}))
        .await;
    assert_eq!(fetched["appointment_id"], 1);

    client
        .ok(json!({"op": "cancel_assignment", "assignment_id": assignment_id}))
        .await;
    let code = client
        .err(json!({"op": "cancel_assignment", "assignment_id": assignment_id}))
        .await;
    assert_eq!(code, "no_such_assignment");

    let (booked, live) = engine.slot_occupancy(allot::model::SlotId(1)).await.unwrap();
    assert_eq!(booked, 1);
    assert_eq!(live, 1);
}

#[tokio::test]
async fn unknown_staff_and_slot_are_reported() {
    let (addr, _engine) = start_test_server().await;
    let mut client = Client::connect(addr).await;
    let code = client
        .err(json!({"op": "schedule_appointment", "appointment_id": 1, "slot_id": 1, "staff_id": 99}))
        .await;
    assert_eq!(code, "unknown_staff");
    let code = client
        .err(json!({"op": "schedule_appointment", "appointment_id": 1, "slot_id": 99, "staff_id": 1}))
        .await;
    assert_eq!(code, "no_such_slot");
}

// ── Framing ──────────────────────────────────────────────────

#[tokio::test]
async fn malformed_line_keeps_connection_open() {
    let (addr, _engine) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    let reply = client.send_raw("this is not json").await;
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["code"], "bad_request");

    let reply = client.call(json!({"op": "launch_rockets"})).await;
    assert_eq!(reply["code"], "bad_request");

    // Same connection still serves requests.
    let zones = client.ok(json!({"op": "list_zones"})).await;
    assert_eq!(zones["zones"].as_array().unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_share_slot_capacity() {
    let (addr, engine) = start_test_server().await;

    let mut handles = Vec::new();
    for i in 0..20u64 {
        handles.push(tokio::spawn(async move {
            let mut client = Client::connect(addr).await;
            client
                .call(json!({
                    "op": "schedule_appointment",
                    "appointment_id": 100 + i,
                    "slot_id": 2,
                    "staff_id": 1 + i % 3
                }))
                .await
        }));
    }

    let mut ok = 0;
    let mut full = 0;
    for h in handles {
        let reply = h.await.unwrap();
        match reply["status"].as_str() {
            Some("ok") => ok += 1,
            _ => {
                assert_eq!(reply["code"], "slot_full");
                full += 1;
            }
        }
    }
    assert_eq!(ok, 10);
    assert_eq!(full, 10);
    let (booked, live) = engine.slot_occupancy(allot::model::SlotId(2)).await.unwrap();
    assert_eq!(booked, 10);
    assert_eq!(live, 10);
}
