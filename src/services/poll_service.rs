use std::time::Duration;

use tokio::{task::AbortHandle, time::sleep};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        poll::{
            CreatePollRequest, JoinRequest, KickStudentRequest, PollSnapshot, Role,
            SubmitAnswerRequest,
        },
        ws::ServerMessage,
    },
    error::ServiceError,
    state::{
        ConnectionId, SharedState,
        lifecycle::CloseReason,
        poll::{ANONYMOUS_PARTICIPANT, Poll},
        session::{ActivePoll, PollSession},
    },
};

/// Open a new poll, persist it and announce it to every client.
///
/// Fails with a conflict while another poll is active. Nothing is published
/// and no poll becomes active when the store rejects the write.
pub async fn create_poll(
    state: &SharedState,
    request: CreatePollRequest,
) -> Result<PollSnapshot, ServiceError> {
    request.validate()?;
    let duration_secs = request
        .duration
        .unwrap_or_else(|| state.config().default_duration_secs());
    let options = request
        .options
        .iter()
        .map(|option| option.trim().to_string())
        .collect();

    let mut guard = state.session().lock().await;
    let session = &mut *guard;
    if let Some(active) = session.active.as_ref() {
        warn!(poll_id = %active.poll.id, "rejecting poll creation while another poll is active");
        return Err(ServiceError::Conflict(format!(
            "poll `{}` is still active",
            active.poll.id
        )));
    }

    let mut poll = Poll::new(request.question.trim().to_string(), options, duration_secs);
    poll.start()?;
    if let Err(err) = state.persist(poll.clone().into()).await {
        error!(poll_id = %poll.id, error = %err, "failed to persist new poll");
        return Err(err);
    }

    session.roster.reset_all_answered();
    let timer = arm_timer(state, poll.id, Duration::from_secs(duration_secs));
    let snapshot = PollSnapshot::from(&poll);
    info!(
        poll_id = %poll.id,
        duration_secs,
        options = poll.options.len(),
        "poll started"
    );
    session.active = Some(ActivePoll::new(poll, timer));

    state
        .fanout()
        .broadcast(&ServerMessage::NewPoll(snapshot.clone()));
    Ok(snapshot)
}

/// Record `connection`'s answer on the active poll and publish the new tallies.
///
/// Checks run in order: unknown poll, ended poll, repeated answer, option range.
/// When every connected student has answered the poll is closed right away.
pub async fn submit_answer(
    state: &SharedState,
    connection: ConnectionId,
    request: SubmitAnswerRequest,
) -> Result<PollSnapshot, ServiceError> {
    let poll_id = parse_poll_id(&request.poll_id)?;

    let mut guard = state.session().lock().await;
    let session = &mut *guard;

    let Some(active) = session
        .active
        .as_mut()
        .filter(|active| active.poll.id == poll_id)
    else {
        let stored = state
            .with_store(move |store| store.find_by_id(poll_id))
            .await?;
        debug!(poll_id = %poll_id, connection_id = %connection, "answer for inactive poll rejected");
        return match stored {
            Some(_) => Err(ServiceError::AlreadyEnded),
            None => Err(not_found(&request.poll_id)),
        };
    };

    let participant = session.roster.get(&connection);
    if active.has_responded(&connection)
        || participant.is_some_and(|participant| participant.answered)
    {
        debug!(poll_id = %poll_id, connection_id = %connection, "duplicate answer rejected");
        return Err(ServiceError::DuplicateAnswer);
    }
    let name = participant
        .map(|participant| participant.name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(ANONYMOUS_PARTICIPANT)
        .to_string();

    let mut updated = active.poll.clone();
    updated.record_answer(name, request.option_index)?;
    if let Err(err) = state.persist(updated.clone().into()).await {
        error!(poll_id = %poll_id, error = %err, "failed to persist answer");
        return Err(err);
    }

    session.roster.mark_answered(&connection);
    active.record_responder(connection);
    let answers = updated.answers.len();
    let snapshot = PollSnapshot::from(&updated);
    active.poll = updated;
    info!(
        poll_id = %poll_id,
        connection_id = %connection,
        option_index = request.option_index,
        "answer recorded"
    );
    state
        .fanout()
        .broadcast(&ServerMessage::PollResults(snapshot.clone()));

    let participants = session.roster.count();
    if participants > 0 && answers >= participants {
        if let Err(err) = close_active(state, session, CloseReason::AllAnswered).await {
            error!(poll_id = %poll_id, error = %err, "failed to close poll after every student answered");
        }
    }

    Ok(snapshot)
}

/// Timer callback closing `poll_id` once its voting window has elapsed.
///
/// Does nothing when `poll_id` is no longer the active poll. A store failure is
/// logged and leaves the poll active.
pub async fn end_poll_on_timeout(state: &SharedState, poll_id: Uuid) {
    let mut guard = state.session().lock().await;
    let session = &mut *guard;

    let is_current = session
        .active
        .as_ref()
        .is_some_and(|active| active.poll.id == poll_id && !active.poll.is_ended());
    if !is_current {
        debug!(poll_id = %poll_id, "timer fired for a poll that is no longer active");
        return;
    }

    if let Err(err) = close_active(state, session, CloseReason::Timeout).await {
        error!(poll_id = %poll_id, error = %err, "failed to close poll on timeout; poll stays active");
    }
}

/// Close the active poll on request.
pub async fn end_active_poll(state: &SharedState) -> Result<PollSnapshot, ServiceError> {
    let mut guard = state.session().lock().await;
    close_active(state, &mut guard, CloseReason::Manual).await
}

/// Register a joining client.
///
/// Students enter the roster, which is then broadcast. Any client joining while
/// a poll is active receives its snapshot privately.
pub async fn join(state: &SharedState, connection: ConnectionId, request: JoinRequest) {
    let mut guard = state.session().lock().await;
    let session = &mut *guard;

    if request.role == Role::Student {
        info!(connection_id = %connection, name = %request.name, "student joined");
        session.roster.upsert(connection, request.name);
        state.fanout().broadcast(&ServerMessage::UpdateParticipants(
            session.roster.names_snapshot(),
        ));
    } else {
        info!(connection_id = %connection, "teacher joined");
    }

    if let Some(active) = session.active.as_ref() {
        state.fanout().notify(
            &connection,
            &ServerMessage::NewPoll(PollSnapshot::from(&active.poll)),
        );
    }
}

/// Forget a closed connection and publish the remaining roster.
pub async fn leave(state: &SharedState, connection: ConnectionId) {
    let mut guard = state.session().lock().await;
    state.fanout().unregister(&connection);

    if let Some(participant) = guard.roster.remove(&connection) {
        info!(connection_id = %connection, name = %participant.name, "student left");
    }
    state.fanout().broadcast(&ServerMessage::UpdateParticipants(
        guard.roster.names_snapshot(),
    ));
}

/// Remove the earliest-joined student with the given name and tell them so.
///
/// Returns whether somebody matched.
pub async fn kick_student(state: &SharedState, request: KickStudentRequest) -> bool {
    let mut guard = state.session().lock().await;

    let Some(connection) = guard.roster.find_first_by_name(&request.student_name) else {
        debug!(name = %request.student_name, "kick ignored: no student with that name");
        return false;
    };

    guard.roster.remove(&connection);
    info!(connection_id = %connection, name = %request.student_name, "student kicked");
    state.fanout().notify(&connection, &ServerMessage::Kicked);
    state.fanout().broadcast(&ServerMessage::UpdateParticipants(
        guard.roster.names_snapshot(),
    ));
    true
}

/// Snapshot of the poll currently accepting answers.
pub async fn active_poll(state: &SharedState) -> Option<PollSnapshot> {
    let guard = state.session().lock().await;
    guard
        .active
        .as_ref()
        .map(|active| PollSnapshot::from(&active.poll))
}

/// Every stored poll, newest first.
pub async fn list_polls(state: &SharedState) -> Result<Vec<PollSnapshot>, ServiceError> {
    let polls = state.with_store(|store| store.list_all()).await?;
    Ok(polls
        .into_iter()
        .map(|entity| PollSnapshot::from(Poll::from(entity)))
        .collect())
}

/// Most recently created poll, if any.
pub async fn latest_poll(state: &SharedState) -> Result<Option<PollSnapshot>, ServiceError> {
    let latest = state.with_store(|store| store.find_latest()).await?;
    Ok(latest.map(|entity| PollSnapshot::from(Poll::from(entity))))
}

/// Stored poll identified by `raw_id`.
pub async fn get_poll(state: &SharedState, raw_id: &str) -> Result<PollSnapshot, ServiceError> {
    let id = parse_poll_id(raw_id)?;
    state
        .with_store(move |store| store.find_by_id(id))
        .await?
        .map(|entity| PollSnapshot::from(Poll::from(entity)))
        .ok_or_else(|| not_found(raw_id))
}

/// Persist the end of the active poll, clear the pointer and announce it.
async fn close_active(
    state: &SharedState,
    session: &mut PollSession,
    reason: CloseReason,
) -> Result<PollSnapshot, ServiceError> {
    let Some(active) = session.active.as_mut() else {
        return Err(ServiceError::NotFound("no poll is active".into()));
    };

    let mut closed = active.poll.clone();
    closed.close(reason)?;
    state.persist(closed.clone().into()).await?;

    // The timeout path runs inside the timer task itself.
    if reason != CloseReason::Timeout {
        active.cancel_timer();
    }
    session.active = None;

    let snapshot = PollSnapshot::from(&closed);
    info!(
        poll_id = %closed.id,
        %reason,
        answers = closed.answers.len(),
        "poll ended"
    );
    state
        .fanout()
        .broadcast(&ServerMessage::PollEnded(snapshot.clone()));
    Ok(snapshot)
}

fn arm_timer(state: &SharedState, poll_id: Uuid, duration: Duration) -> AbortHandle {
    let state = state.clone();
    tokio::spawn(async move {
        sleep(duration).await;
        end_poll_on_timeout(&state, poll_id).await;
    })
    .abort_handle()
}

fn parse_poll_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| not_found(raw))
}

fn not_found(raw: &str) -> ServiceError {
    ServiceError::NotFound(format!("poll `{raw}` not found"))
}
