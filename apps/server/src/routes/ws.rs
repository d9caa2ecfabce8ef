use actix_web::{HttpRequest, HttpResponse, get, rt, web};
use actix_ws::{Message, MessageStream, Session};
use ravenwatch::Subscription;

use crate::state::AppState;

macros_utils::routes! {
    route ws_route,
}

/// Push channel. The first frame is the current snapshot, every cycle
/// afterwards sends `checking_started` and `status_update`.
#[get("")]
pub async fn ws_route(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, messages) = actix_ws::handle(&req, body)?;
    let subscription = state.engine.subscribe();

    tracing::info!(subscribers = state.engine.subscriber_count(), "Push client connected");
    rt::spawn(serve(session, messages, subscription));

    Ok(response)
}

async fn serve(mut session: Session, mut messages: MessageStream, mut subscription: Subscription) {
    let reason = loop {
        tokio::select! {
            pushed = subscription.recv() => {
                let Some(pushed) = pushed else { break None };
                let text = match pushed.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to encode push message");
                        continue;
                    }
                };
                if session.text(text).await.is_err() {
                    break None;
                }
            }
            incoming = messages.recv() => match incoming {
                Some(Ok(Message::Text(text))) if text.trim() == "ping" => {
                    if session.text("pong").await.is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Close(reason))) => break reason,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Push client protocol error");
                    break None;
                }
                None => break None,
            },
        }
    };

    // Already gone when the client dropped first
    let _ = session.close(reason).await;
    tracing::info!("Push client disconnected");
}
