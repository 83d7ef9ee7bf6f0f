use super::*;

/// Connection whose liveness answers are scripted
struct ScriptedConnection {
    alive: Vec<bool>,
    checks: usize,
    reconnects: usize,
    fail_reconnect: bool,
}

impl ScriptedConnection {
    fn new(alive: &[bool]) -> Self {
        Self {
            alive: alive.to_vec(),
            checks: 0,
            reconnects: 0,
            fail_reconnect: false,
        }
    }
}

#[async_trait]
impl Reconnect for ScriptedConnection {
    async fn check_connection(&self) -> bool {
        self.alive.get(self.checks).copied().unwrap_or(false)
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.reconnects += 1;
        if self.fail_reconnect {
            return Err(RecsError::Database("server unreachable".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn live_connection_is_not_reconnected() {
    let mut connection = ScriptedConnection::new(&[true]);

    let reconnected = ensure_connected(&mut connection)
        .await
        .expect("live connection needs no work");

    assert!(!reconnected);
    assert_eq!(connection.reconnects, 0);
}

#[tokio::test]
async fn disconnect_triggers_exactly_one_reconnect() {
    // Even though the server keeps reporting down, only one reconnect is made
    let mut connection = ScriptedConnection::new(&[false, false, false]);

    let reconnected = ensure_connected(&mut connection)
        .await
        .expect("reconnect itself succeeds");

    assert!(reconnected);
    assert_eq!(connection.reconnects, 1);
}

#[tokio::test]
async fn failed_reconnect_surfaces_database_error() {
    let mut connection = ScriptedConnection::new(&[false]);
    connection.fail_reconnect = true;

    let result = ensure_connected(&mut connection).await;

    assert!(matches!(result, Err(RecsError::Database(_))));
    assert_eq!(connection.reconnects, 1);
}

#[tokio::test]
async fn each_call_checks_independently() {
    let mut connection = ScriptedConnection::new(&[false]);

    ensure_connected(&mut connection)
        .await
        .expect("first call reconnects");
    connection.checks += 1;
    connection.alive.push(true);
    ensure_connected(&mut connection)
        .await
        .expect("second call finds a live connection");

    assert_eq!(connection.reconnects, 1);
}

#[tokio::test]
async fn invalid_uri_is_rejected() {
    let result = MongoConnection::connect("not-a-mongo-uri", "RecommendationSystem").await;
    assert!(matches!(result, Err(RecsError::Database(_))));
}
