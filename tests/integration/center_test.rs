//! Notification session wired to a real WebSocket server.

use serde_json::json;

use notifyhub_core::config::store::StoreConfig;
use notifyhub_core::types::UserId;
use notifyhub_realtime::notification::{
    NewNotification, NotificationFilter, NotificationKind, NotificationPreferences,
    PreferencesPatch, Priority,
};
use notifyhub_realtime::{
    ConnectionStatus, NotificationCenter, NotificationStore, TransportConnection,
};

use crate::helpers::{eventually, ServerConn, TestServer};

async fn session(server: &mut TestServer) -> (NotificationCenter, ServerConn, UserId) {
    let user = UserId::new();
    let config = StoreConfig::default();
    let transport = TransportConnection::new(&server.transport_config()).unwrap();
    let store = NotificationStore::new(NotificationPreferences::for_user(user), &config);
    let center = NotificationCenter::new(transport, store, &config).unwrap();
    center.connect().await.expect("connect");
    let conn = server.accept().await;
    (center, conn, user)
}

#[tokio::test]
async fn test_pushed_notifications_are_stored_newest_first() {
    let mut server = TestServer::start().await;
    let (center, mut conn, user) = session(&mut server).await;

    for (title, priority) in [("Booking", "normal"), ("Payment", "high")] {
        conn.push(
            "notification",
            json!({
                "userId": user,
                "type": "booking_request",
                "priority": priority,
                "title": title,
                "message": "details",
            }),
        )
        .await;
    }
    conn.push(
        "notification",
        json!({ "userId": UserId::new(), "type": "new_message", "title": "x", "message": "y" }),
    )
    .await;
    conn.push("notification", json!({ "garbage": true })).await;

    assert!(eventually(|| center.unread_count() == 2).await);
    let list = center.get_filtered(&NotificationFilter::default());
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].title, "Payment");
    assert_eq!(list[0].priority, Priority::High);
    assert_eq!(
        center.with_store(|s| s.connection_status()),
        ConnectionStatus::Connected
    );
    center.disconnect().await;
}

#[tokio::test]
async fn test_local_changes_are_mirrored_to_server() {
    let mut server = TestServer::start().await;
    let (center, mut conn, user) = session(&mut server).await;

    let new = NewNotification::new(user, NotificationKind::NewMessage, "Hi", "there");
    center.add_notification(new).unwrap();
    let id = center.get_filtered(&NotificationFilter::default())[0].id;

    center.mark_as_read(id).unwrap();
    center.mark_as_read(id).unwrap();
    center.archive(id).unwrap();
    center
        .update_preferences(PreferencesPatch {
            sound_volume: Some(25),
            ..Default::default()
        })
        .unwrap();

    let read = conn.next_message().await;
    assert_eq!(read["type"], "notification_read");
    assert_eq!(read["data"]["notificationId"], id.to_string());

    let archived = conn.next_message().await;
    assert_eq!(archived["type"], "notification_archived");

    let prefs = conn.next_message().await;
    assert_eq!(prefs["type"], "preferences_updated");
    assert_eq!(prefs["data"]["soundVolume"], 25);
    assert_eq!(prefs["data"]["channels"]["inApp"], true);
    center.disconnect().await;
}

#[tokio::test]
async fn test_server_preferences_gate_later_notifications() {
    let mut server = TestServer::start().await;
    let (center, mut conn, user) = session(&mut server).await;

    let mut prefs = NotificationPreferences::for_user(user);
    prefs.types.insert(NotificationKind::Promotion, false);
    let data = serde_json::to_value(&prefs).unwrap();
    conn.push("preferences_updated", data).await;
    conn.push(
        "notification",
        json!({ "userId": user, "type": "promotion", "title": "Sale", "message": "50% off" }),
    )
    .await;

    assert!(eventually(|| center.with_store(|s| s.notifications().len()) == 1).await);
    assert_eq!(center.unread_count(), 0);
    assert_eq!(
        center.preferences().types.get(&NotificationKind::Promotion),
        Some(&false)
    );
    center.disconnect().await;
}
