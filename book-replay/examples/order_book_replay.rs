use book_replay::{
    Navigator, ReplayScheduler, SnapshotStore, Step, ingest::snapshots_from_json,
    logging::init_logging,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialise Tracing subscriber
    init_logging();

    // Raw depth-indexed entries, as delivered by the external acquisition step
    let payload = json!([
        { "Time": "09:30:00.000000", "Bid1": 100.5, "Bid1Size": 3, "Ask1": 100.7, "Ask1Size": 2 },
        { "Time": "09:30:00.250000", "Bid1": 100.6, "Bid1Size": 1, "Ask1": 100.7, "Ask1Size": 5 },
        { "Time": "09:30:01.000000", "Bid1": 100.6, "Bid1Size": 4, "Ask1": 100.8, "Ask1Size": 1 },
    ])
    .to_string();

    let snapshots = snapshots_from_json(payload.as_bytes()).expect("raw entries are well-formed");

    // Explicitly constructed store shared with both controllers (constructor injection)
    let store = Arc::new(SnapshotStore::new());
    let navigator = Navigator::new(Arc::clone(&store));
    let scheduler = ReplayScheduler::new(Arc::clone(&store));

    let subscription = store.subscribe(|view| {
        info!(
            position = view.position(),
            total = view.total(),
            replaying = view.is_replaying(),
            mid_price = ?view.current().and_then(|snapshot| snapshot.mid_price()),
            "store updated"
        );
    });

    store.load(snapshots);

    // Manual navigation
    navigator.step(Step::Forward);
    navigator.go_to_time("09:30:01.000000");
    navigator.go_to(0);

    // Animated replay: 1s of real spacing compressed into 3s of wall-clock
    scheduler.start_replay(Duration::from_secs(3));
    while scheduler.is_replaying() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    info!(final_position = store.position(), "replay complete");
    subscription.unsubscribe();
}
