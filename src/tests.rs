//! Integration tests for the orgtrack backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::permissions::PolicyTable;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            policy_path: None,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
            policy: Arc::new(PolicyTable::default()),
            config: Arc::new(config),
            org_lock: Arc::new(tokio::sync::Mutex::new(())),
        };

        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a member; panics on a non-200 response.
    async fn register(&self, actor: &str, id: &str, level: &str, parent: Option<&str>) {
        let resp = self
            .client
            .post(self.url("/api/members"))
            .json(&json!({
                "actorId": actor,
                "id": id,
                "displayName": id,
                "accessLevel": level,
                "parentId": parent,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "registering {} failed", id);
    }

    /// Standard six-member org used by most tests:
    /// root (Admin) > reg (Regional) > leader (LocalLeader) >
    /// {shift (ShiftLeader), base1, base2 (Base)}.
    async fn seed_org(&self) {
        self.register("root", "root", "ADMIN", None).await;
        self.register("root", "reg", "REGIONAL", Some("root")).await;
        self.register("root", "leader", "LOCAL_LEADER", Some("reg")).await;
        self.register("root", "shift", "SHIFT_LEADER", Some("leader")).await;
        self.register("root", "base1", "BASE", Some("leader")).await;
        self.register("root", "base2", "BASE", Some("leader")).await;
    }

    /// Create a team owned by `actor` and return its id.
    async fn create_team(&self, actor: &str, name: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/teams"))
            .json(&json!({ "actorId": actor, "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Add a member to a team; panics on a non-200 response.
    async fn add_team_member(&self, actor: &str, team_id: &str, member_id: &str, role: &str) {
        let resp = self
            .client
            .post(self.url(&format!("/api/teams/{}/members", team_id)))
            .json(&json!({ "actorId": actor, "memberId": member_id, "role": role }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "adding {} to team failed", member_id);
    }

    /// Create a pocket in a team and return its id.
    async fn create_pocket(&self, actor: &str, team_id: &str, name: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/pockets"))
            .json(&json!({ "actorId": actor, "teamId": team_id, "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn add_pocket_member(&self, actor: &str, pocket_id: &str, member_id: &str, role: &str) {
        let resp = self
            .client
            .post(self.url(&format!("/api/pockets/{}/members", pocket_id)))
            .json(&json!({ "actorId": actor, "memberId": member_id, "role": role }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "adding {} to pocket failed", member_id);
    }

    async fn get_json(&self, path: &str) -> Value {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200, "GET {} failed", path);
        resp.json().await.unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::with_psk(Some("secret-key".to_string())).await;

    // Plain client without the default x-api-key header
    let resp = Client::new()
        .get(fixture.url("/api/members?actor=root"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::with_psk(Some("secret-key".to_string())).await;

    let resp = Client::new()
        .get(fixture.url("/api/members?actor=root"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_bearer_token_accepted() {
    let fixture = TestFixture::with_psk(Some("secret-key".to_string())).await;

    let resp = Client::new()
        .post(fixture.url("/api/members"))
        .header("Authorization", "Bearer secret-key")
        .json(&json!({
            "actorId": "root",
            "id": "root",
            "displayName": "Root",
            "accessLevel": "ADMIN",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_hierarchy_paths_and_queries() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let body = fixture.get_json("/api/members/leader?actor=root").await;
    assert_eq!(body["data"]["path"], "/root/reg/leader/");
    assert_eq!(body["data"]["depth"], 2);

    // Subtree of leader contains leader and the three below
    let subtree = fixture
        .get_json("/api/members/leader/subtree?actor=root")
        .await;
    let mut ids: Vec<&str> = subtree["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["base1", "base2", "leader", "shift"]);

    // Ancestors of shift, nearest first
    let ancestors = fixture
        .get_json("/api/members/shift/ancestors?actor=root")
        .await;
    let chain: Vec<&str> = ancestors["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(chain, vec!["leader", "reg", "root"]);
}

#[tokio::test]
async fn test_register_gates() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    // A Base member cannot register anyone
    let resp = fixture
        .client
        .post(fixture.url("/api/members"))
        .json(&json!({
            "actorId": "base1",
            "id": "intruder",
            "displayName": "Intruder",
            "accessLevel": "BASE",
            "parentId": "leader",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Only an Admin can create a second root
    let resp = fixture
        .client
        .post(fixture.url("/api/members"))
        .json(&json!({
            "actorId": "reg",
            "id": "root2",
            "displayName": "Root 2",
            "accessLevel": "ADMIN",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Ids containing the path separator are rejected
    let resp = fixture
        .client
        .post(fixture.url("/api/members"))
        .json(&json!({
            "actorId": "root",
            "id": "bad/id",
            "displayName": "Bad",
            "accessLevel": "BASE",
            "parentId": "root",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_reparent_rejects_cycles() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let resp = fixture
        .client
        .put(fixture.url("/api/members/reg/parent"))
        .json(&json!({ "actorId": "root", "parentId": "shift" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CYCLE");

    // Hierarchy unchanged
    let body = fixture.get_json("/api/members/reg?actor=root").await;
    assert_eq!(body["data"]["path"], "/root/reg/");
}

#[tokio::test]
async fn test_reparent_cascades_to_descendants() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    // Move leader directly under root; shift and the bases must follow
    let resp = fixture
        .client
        .put(fixture.url("/api/members/leader/parent"))
        .json(&json!({ "actorId": "root", "parentId": "root" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["path"], "/root/leader/");
    assert_eq!(body["data"]["depth"], 1);

    let shift = fixture.get_json("/api/members/shift?actor=root").await;
    assert_eq!(shift["data"]["path"], "/root/leader/shift/");
    assert_eq!(shift["data"]["depth"], 2);
}

#[tokio::test]
async fn test_racing_reparents_cannot_form_cycle() {
    let fixture = TestFixture::new().await;
    fixture.register("root", "root", "ADMIN", None).await;
    fixture.register("root", "b", "REGIONAL", Some("root")).await;
    fixture.register("root", "c", "REGIONAL", Some("root")).await;

    // Two opposing moves in flight at once. Each would pass the cycle
    // check in isolation; together they would link b and c into a loop.
    let move_b = fixture
        .client
        .put(fixture.url("/api/members/b/parent"))
        .json(&json!({ "actorId": "root", "parentId": "c" }))
        .send();
    let move_c = fixture
        .client
        .put(fixture.url("/api/members/c/parent"))
        .json(&json!({ "actorId": "root", "parentId": "b" }))
        .send();
    let (first, second) = tokio::join!(move_b, move_c);
    let responses = vec![first.unwrap(), second.unwrap()];

    let mut statuses: Vec<u16> = responses.iter().map(|r| r.status().as_u16()).collect();
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 409], "exactly one move must win");

    for resp in responses {
        if resp.status() == 409 {
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["error"]["code"], "CYCLE");
        }
    }

    // The stored parent links must not point at each other
    let b = fixture.get_json("/api/members/b?actor=root").await;
    let c = fixture.get_json("/api/members/c?actor=root").await;
    let b_parent = b["data"]["parentId"].as_str().unwrap();
    let c_parent = c["data"]["parentId"].as_str().unwrap();
    assert!(
        (b_parent == "c" && c_parent == "root") || (c_parent == "b" && b_parent == "root"),
        "unexpected parents: b -> {}, c -> {}",
        b_parent,
        c_parent
    );
}

#[tokio::test]
async fn test_delete_reattaches_reports() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let resp = fixture
        .client
        .delete(fixture.url("/api/members/leader"))
        .json(&json!({ "actorId": "root" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // shift now reports to reg, paths rewritten
    let shift = fixture.get_json("/api/members/shift?actor=root").await;
    assert_eq!(shift["data"]["parentId"], "reg");
    assert_eq!(shift["data"]["path"], "/root/reg/shift/");

    let gone = fixture
        .client
        .get(fixture.url("/api/members/leader?actor=root"))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_team_membership_and_duplicate_join() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let team_id = fixture.create_team("leader", "North").await;
    fixture
        .add_team_member("leader", &team_id, "shift", "SHIFT_LEADER")
        .await;

    // Joining twice is a conflict
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/teams/{}/members", team_id)))
        .json(&json!({ "actorId": "leader", "memberId": "shift", "role": "SHIFT_LEADER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "ALREADY_MEMBER");

    // A ShiftLeader may not manage the team
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/teams/{}/members", team_id)))
        .json(&json!({ "actorId": "shift", "memberId": "base1", "role": "BASE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Detail shows the membership with its role
    let detail = fixture
        .get_json(&format!("/api/teams/{}?actor=leader", team_id))
        .await;
    let members = detail["data"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["memberId"], "shift");
    assert_eq!(members[0]["role"], "SHIFT_LEADER");
}

#[tokio::test]
async fn test_move_member_between_teams() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let north = fixture.create_team("leader", "North").await;
    let south = fixture.create_team("leader", "South").await;
    fixture.add_team_member("leader", &north, "base1", "BASE").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/teams/move-member"))
        .json(&json!({
            "actorId": "leader",
            "memberId": "base1",
            "fromTeamId": north,
            "toTeamId": south,
            "role": "BASE",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Repeating the same move fails: base1 left the source team
    let resp = fixture
        .client
        .post(fixture.url("/api/teams/move-member"))
        .json(&json!({
            "actorId": "leader",
            "memberId": "base1",
            "fromTeamId": north,
            "toTeamId": south,
            "role": "BASE",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_MOVE");

    let detail = fixture
        .get_json(&format!("/api/teams/{}?actor=leader", south))
        .await;
    assert_eq!(detail["data"]["members"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_pocket_moves_stay_within_team() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let north = fixture.create_team("leader", "North").await;
    let south = fixture.create_team("leader", "South").await;
    fixture.add_team_member("leader", &north, "base1", "BASE").await;

    let alpha = fixture.create_pocket("leader", &north, "Alpha").await;
    let beta = fixture.create_pocket("leader", &north, "Beta").await;
    let gamma = fixture.create_pocket("leader", &south, "Gamma").await;
    fixture.add_pocket_member("leader", &alpha, "base1", "BASE").await;

    // Cross-team pocket move is rejected
    let resp = fixture
        .client
        .post(fixture.url("/api/pockets/move-member"))
        .json(&json!({
            "actorId": "leader",
            "memberId": "base1",
            "fromPocketId": alpha,
            "toPocketId": gamma,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_MOVE");

    // Same-team move succeeds
    let resp = fixture
        .client
        .post(fixture.url("/api/pockets/move-member"))
        .json(&json!({
            "actorId": "leader",
            "memberId": "base1",
            "fromPocketId": alpha,
            "toPocketId": beta,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["pocketId"], beta.as_str());
    assert_eq!(body["data"]["isLead"], false);
}

#[tokio::test]
async fn test_duplicate_pocket_name_is_a_conflict() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let team_id = fixture.create_team("leader", "North").await;
    fixture.create_pocket("leader", &team_id, "Alpha").await;

    // The unique (team, name) index rejects the second row as a conflict,
    // not a server error
    let resp = fixture
        .client
        .post(fixture.url("/api/pockets"))
        .json(&json!({ "actorId": "leader", "teamId": team_id, "name": "Alpha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DUPLICATE");
}

#[tokio::test]
async fn test_pocket_lead_assignment() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let team_id = fixture.create_team("leader", "North").await;
    fixture.add_team_member("leader", &team_id, "base1", "BASE").await;
    fixture.add_team_member("leader", &team_id, "base2", "BASE").await;
    let pocket = fixture.create_pocket("leader", &team_id, "Alpha").await;
    fixture.add_pocket_member("leader", &pocket, "base1", "BASE").await;
    fixture.add_pocket_member("leader", &pocket, "base2", "BASE").await;

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/pockets/{}/lead", pocket)))
        .json(&json!({ "actorId": "leader", "memberId": "base1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // A second lead is rejected while the first holds the role
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/pockets/{}/lead", pocket)))
        .json(&json!({ "actorId": "leader", "memberId": "base2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let detail = fixture
        .get_json(&format!("/api/pockets/{}?actor=leader", pocket))
        .await;
    let members = detail["data"][1].as_array().unwrap();
    let leads: Vec<&Value> = members
        .iter()
        .filter(|m| m["isLead"] == true)
        .collect();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["memberId"], "base1");
}

#[tokio::test]
async fn test_activity_logging_and_fanout() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let team_id = fixture.create_team("leader", "North").await;
    fixture
        .add_team_member("leader", &team_id, "leader", "LOCAL_LEADER")
        .await;
    fixture.add_team_member("leader", &team_id, "base1", "BASE").await;

    // Clear reg's inbox of the registration notifications from seeding
    fixture
        .client
        .post(fixture.url("/api/notifications/read-all"))
        .json(&json!({ "actorId": "reg" }))
        .send()
        .await
        .unwrap();

    // base1 logs their own visits
    let resp = fixture
        .client
        .post(fixture.url("/api/activities"))
        .json(&json!({
            "actorId": "base1",
            "memberId": "base1",
            "kind": "visit",
            "count": 3,
            "weekStart": "2026-08-24",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The record shows up under the member
    let body = fixture
        .get_json("/api/members/base1/activities?actor=leader")
        .await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["kind"], "visit");
    assert_eq!(records[0]["count"], 3);

    // The team leader, the Regional ancestor and the Admin are notified
    for recipient in ["leader", "reg", "root"] {
        let count = fixture
            .get_json(&format!("/api/notifications/unread-count?actor={}", recipient))
            .await;
        assert_eq!(count["data"]["count"], 1, "{} should be notified", recipient);
    }

    // base2 is not
    let count = fixture
        .get_json("/api/notifications/unread-count?actor=base2")
        .await;
    assert_eq!(count["data"]["count"], 0);

    // The notification carries the subject and kind
    let inbox = fixture.get_json("/api/notifications?actor=leader").await;
    let items = inbox["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "activity_added");
    assert_eq!(items[0]["subjectId"], "base1");

    // Mark it read
    let id = items[0]["id"].as_str().unwrap();
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/notifications/{}/read", id)))
        .json(&json!({ "actorId": "leader" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let count = fixture
        .get_json("/api/notifications/unread-count?actor=leader")
        .await;
    assert_eq!(count["data"]["count"], 0);
}

#[tokio::test]
async fn test_activity_gates_and_validation() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    // base1 may not log for base2
    let resp = fixture
        .client
        .post(fixture.url("/api/activities"))
        .json(&json!({
            "actorId": "base1",
            "memberId": "base2",
            "kind": "contact",
            "count": 1,
            "weekStart": "2026-08-24",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Bad week start
    let resp = fixture
        .client
        .post(fixture.url("/api/activities"))
        .json(&json!({
            "actorId": "base1",
            "memberId": "base1",
            "kind": "contact",
            "count": 1,
            "weekStart": "next monday",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_targets_upsert() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    for target in [10, 15] {
        let resp = fixture
            .client
            .post(fixture.url("/api/targets"))
            .json(&json!({
                "actorId": "root",
                "memberId": "base1",
                "kind": "contact",
                "weekStart": "2026-08-24",
                "target": target,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    // Second write overwrote the first
    let body = fixture.get_json("/api/targets/base1?actor=root").await;
    let targets = body["data"].as_array().unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0]["target"], 15);
}

#[tokio::test]
async fn test_member_registration_fanout() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    // root registered everyone; reg was notified for each member below it
    let inbox = fixture.get_json("/api/notifications?actor=reg").await;
    let kinds: Vec<&str> = inbox["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    // leader, shift, base1, base2 all registered in reg's subtree
    assert_eq!(kinds.len(), 4);
    assert!(kinds.iter().all(|k| *k == "member_registered"));

    // Mark everything read at once
    let resp = fixture
        .client
        .post(fixture.url("/api/notifications/read-all"))
        .json(&json!({ "actorId": "reg" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["count"], 4);
}

#[tokio::test]
async fn test_list_scoping_per_level() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    // Admin sees everyone
    let body = fixture.get_json("/api/members?actor=root").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 6);

    // Regional sees its subtree
    let body = fixture.get_json("/api/members?actor=reg").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    // A Base member with no team sees only themselves
    let body = fixture.get_json("/api/members?actor=base1").await;
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["id"], "base1");

    // And may not fetch a sibling directly
    let resp = fixture
        .client
        .get(fixture.url("/api/members/base2?actor=base1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_shared_team_widens_visibility() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let team_id = fixture.create_team("leader", "North").await;
    fixture
        .add_team_member("leader", &team_id, "shift", "SHIFT_LEADER")
        .await;
    fixture.add_team_member("leader", &team_id, "base1", "BASE").await;

    // shift now sees their teammate
    let resp = fixture
        .client
        .get(fixture.url("/api/members/base1?actor=shift"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // but still not the non-teammate sibling
    let resp = fixture
        .client
        .get(fixture.url("/api/members/base2?actor=shift"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_team_list_scoping() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let north = fixture.create_team("leader", "North").await;
    fixture
        .add_team_member("leader", &north, "shift", "SHIFT_LEADER")
        .await;

    // The owner and the Regional above see the team
    for actor in ["leader", "reg", "root", "shift"] {
        let body = fixture
            .get_json(&format!("/api/teams?actor={}", actor))
            .await;
        assert_eq!(
            body["data"].as_array().unwrap().len(),
            1,
            "{} should see the team",
            actor
        );
    }

    // A Base member sees no teams at all
    let body = fixture.get_json("/api/teams?actor=base1").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;
    fixture.seed_org().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/members/ghost?actor=root"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let resp = fixture
        .client
        .get(fixture.url("/api/teams/ghost?actor=root"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
