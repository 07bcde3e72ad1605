use std::sync::Once;

use audiofetch_core::{
    update, AppState, ChannelEvent, ConnectionStatus, DownloadForm, Effect, FetchPurpose, Msg,
    CONNECT_TIMEOUT_MS, FALLBACK_POLL_INTERVAL_MS, RECONNECT_DELAY_MS,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(audiofetch_logging::initialize_for_tests);
}

fn tick(state: AppState, now: u64) -> (AppState, Vec<Effect>) {
    update(state, Msg::Tick { now })
}

fn channel(state: AppState, event: ChannelEvent) -> (AppState, Vec<Effect>) {
    update(state, Msg::Channel(event))
}

fn polls(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| {
            **effect
                == Effect::FetchJobs {
                    purpose: FetchPurpose::FallbackPoll,
                }
        })
        .count()
}

#[test]
fn first_tick_starts_the_client() {
    init_logging();
    let (state, effects) = tick(AppState::new(), 1_000);

    assert_eq!(
        effects,
        vec![
            Effect::OpenChannel,
            Effect::FetchJobs {
                purpose: FetchPurpose::InitialLoad
            },
            Effect::LoadConfig,
        ]
    );
    assert_eq!(state.view().connection, ConnectionStatus::Disconnected);

    let (_state, effects) = tick(state, 1_250);
    assert!(effects.is_empty());
}

#[test]
fn open_channel_reconciles_and_reports_connected() {
    init_logging();
    let (state, _) = tick(AppState::new(), 0);
    let (state, effects) = channel(state, ChannelEvent::Opened);

    assert_eq!(
        effects,
        vec![Effect::FetchJobs {
            purpose: FetchPurpose::Reconcile
        }]
    );
    assert_eq!(state.view().connection, ConnectionStatus::Connected);
}

#[test]
fn disconnect_starts_polling_within_one_interval_and_reconnect_stops_it() {
    init_logging();
    let (state, _) = tick(AppState::new(), 0);
    let (state, _) = channel(state, ChannelEvent::Opened);
    let (state, _) = tick(state, 10_000);
    let (state, effects) = channel(state, ChannelEvent::Closed);
    assert!(effects.is_empty());
    assert_eq!(state.view().connection, ConnectionStatus::Disconnected);
    assert!(state.channel().is_polling());

    // Reconnect attempts fail; polling still fires within one interval.
    let mut state = state;
    let mut poll_count = 0;
    let mut now = 10_000;
    while now <= 10_000 + FALLBACK_POLL_INTERVAL_MS {
        now += 1_000;
        let (next, effects) = tick(state, now);
        state = next;
        poll_count += polls(&effects);
        if effects.contains(&Effect::OpenChannel) {
            let (next, _) = channel(state, ChannelEvent::Closed);
            state = next;
        }
    }
    assert_eq!(poll_count, 1);

    let (state, _) = channel(state, ChannelEvent::Opened);
    assert!(!state.channel().is_polling());
    let (_state, effects) = tick(state, now + 5 * FALLBACK_POLL_INTERVAL_MS);
    assert_eq!(polls(&effects), 0);
}

#[test]
fn reconnect_is_attempted_after_fixed_delay() {
    init_logging();
    let (state, _) = tick(AppState::new(), 0);
    let (state, _) = channel(state, ChannelEvent::Opened);
    let (state, _) = tick(state, 5_000);
    let (state, _) = channel(state, ChannelEvent::Closed);

    let (state, effects) = tick(state, 5_000 + RECONNECT_DELAY_MS - 1);
    assert!(!effects.contains(&Effect::OpenChannel));
    let (_state, effects) = tick(state, 5_000 + RECONNECT_DELAY_MS);
    assert!(effects.contains(&Effect::OpenChannel));
}

#[test]
fn silent_connect_attempt_is_retried_and_polling_starts() {
    init_logging();
    let (mut state, _) = tick(AppState::new(), 0);

    // The transport never reports open or close.
    let mut opens = 0;
    let mut poll_count = 0;
    let mut now = 0;
    while now < CONNECT_TIMEOUT_MS + RECONNECT_DELAY_MS + FALLBACK_POLL_INTERVAL_MS {
        now += 500;
        let (next, effects) = tick(state, now);
        state = next;
        opens += effects
            .iter()
            .filter(|effect| **effect == Effect::OpenChannel)
            .count();
        poll_count += polls(&effects);
    }
    assert!(opens >= 1);
    assert_eq!(poll_count, 1);
    assert_eq!(state.view().connection, ConnectionStatus::Disconnected);
}

#[test]
fn connection_id_is_attached_to_new_jobs_and_cleared_on_disconnect() {
    init_logging();
    let form = DownloadForm {
        url: "https://example.com/album".to_string(),
        ..DownloadForm::default()
    };

    let (state, _) = tick(AppState::new(), 0);
    let (state, _) = channel(state, ChannelEvent::Opened);
    let (state, _) = channel(
        state,
        ChannelEvent::ConnectionEstablished {
            connection_id: "conn-1".to_string(),
        },
    );
    let (state, effects) = update(state, Msg::DownloadSubmitted(form.clone()));
    match effects.as_slice() {
        [Effect::CreateJob(request)] => {
            assert_eq!(request.connection_id.as_deref(), Some("conn-1"))
        }
        other => panic!("unexpected effects {other:?}"),
    }

    let (state, _) = channel(state, ChannelEvent::Closed);
    let (_state, effects) = update(state, Msg::DownloadSubmitted(form));
    match effects.as_slice() {
        [Effect::CreateJob(request)] => assert_eq!(request.connection_id, None),
        other => panic!("unexpected effects {other:?}"),
    }
}
