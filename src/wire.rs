use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use crate::engine::{Engine, EngineError};
use crate::limits::MAX_LINE_LEN;
use crate::observability::{REQUESTS_TOTAL, REQUEST_DURATION_SECONDS, request_label};
use crate::protocol::{self, Outcome, Reply, Request};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("line codec: {0}")]
    Codec(#[from] LinesCodecError),
    #[error("encode reply: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Dispatch one parsed request to the engine.
pub async fn execute(engine: &Engine, req: Request) -> Result<Outcome, EngineError> {
    match req {
        Request::PlaceOrder(new) => engine.place_order(new).await.map(Outcome::Order),
        Request::UpdateOrderStatus { order_id, status } => engine
            .update_order_status(order_id, status)
            .await
            .map(Outcome::Order),
        Request::ScheduleAppointment {
            appointment_id,
            slot_id,
            staff_id,
        } => engine
            .schedule_appointment(appointment_id, slot_id, staff_id)
            .await
            .map(Outcome::Assignment),
        Request::CancelAssignment { assignment_id } => engine
            .cancel_assignment(assignment_id)
            .await
            .map(Outcome::Assignment),
        Request::GetOrder { order_id } => engine.get_order(order_id).await.map(Outcome::Order),
        Request::GetAssignment { assignment_id } => {
            engine.get_assignment(assignment_id).map(Outcome::Assignment)
        }
        Request::ListZones => Ok(Outcome::Zones {
            zones: engine.list_zones().await,
        }),
        Request::ListSlots { open_only } => Ok(Outcome::Slots {
            slots: engine.list_slots(open_only).await,
        }),
    }
}

/// Parse, execute and time a single line.
pub async fn handle_line(engine: &Engine, line: &str) -> Reply {
    let req = match protocol::parse_request(line) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!("rejected request line: {e}");
            metrics::counter!(REQUESTS_TOTAL, "op" => "unknown", "status" => "bad_request")
                .increment(1);
            return e.into();
        }
    };

    let op = request_label(&req);
    let started = Instant::now();
    let result = execute(engine, req).await;
    metrics::histogram!(REQUEST_DURATION_SECONDS, "op" => op).record(started.elapsed().as_secs_f64());
    let status = match &result {
        Ok(_) => "ok",
        Err(e) => e.code(),
    };
    metrics::counter!(REQUESTS_TOTAL, "op" => op, "status" => status).increment(1);
    result.into()
}

/// Serve one client until it disconnects. Replies are written in request order.
pub async fn process_connection<S>(stream: S, engine: Arc<Engine>) -> Result<(), WireError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LEN));
    while let Some(line) = framed.next().await {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&engine, &line).await;
        framed.send(serde_json::to_string(&reply)?).await?;
    }
    Ok(())
}
