use chrono::{TimeZone, Utc};
use gigstore::storage::FixedTimeSource;
use gigstore::{Database, Error};
use serde_json::{json, Value};
use tempfile::tempdir;

fn fixed_clock() -> Box<FixedTimeSource> {
    Box::new(FixedTimeSource(
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
    ))
}

fn ids(rows: &[gigstore::storage::Record]) -> Vec<&str> {
    rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
}

#[test]
fn test_insert_select_round_trip() {
    let db = Database::in_memory_with_time_source(fixed_clock());

    let result = db
        .prepare("INSERT INTO users (id, email, name) VALUES (?, ?, ?)")
        .run(&[json!("u1"), json!("ada@mit.edu"), json!("Ada")])
        .unwrap();
    assert_eq!(result.changes, 1);

    let user = db
        .prepare("SELECT * FROM users WHERE email = ?")
        .get(&[json!("ada@mit.edu")])
        .unwrap();
    assert_eq!(user["id"], json!("u1"));
    assert_eq!(user["name"], json!("Ada"));
    assert_eq!(user["created_at"], json!("2024-06-01T08:00:00.000Z"));
}

#[test]
fn test_update_coalesce_is_idempotent() {
    let db = Database::in_memory();
    db.prepare("INSERT INTO projects (id, title, status) VALUES (?, ?, ?)")
        .run(&[json!("p1"), json!("Site"), json!("open")])
        .unwrap();

    let update = db.prepare(
        "UPDATE projects SET title = COALESCE(?, title), status = COALESCE(?, status) WHERE id = ?",
    );

    update.run(&[Value::Null, json!("closed"), json!("p1")]).unwrap();
    let first = db.snapshot("projects");
    update.run(&[Value::Null, json!("closed"), json!("p1")]).unwrap();
    let second = db.snapshot("projects");

    assert_eq!(first, second);
    assert_eq!(second[0]["title"], json!("Site"));
    assert_eq!(second[0]["status"], json!("closed"));
}

#[test]
fn test_delete_completeness() {
    let db = Database::in_memory();
    let insert = db.prepare("INSERT INTO applications (id, project_id) VALUES (?, ?)");
    insert.run(&[json!("a1"), json!("p1")]).unwrap();
    insert.run(&[json!("a2"), json!("p2")]).unwrap();
    insert.run(&[json!("a3"), json!("p1")]).unwrap();

    let removed = db
        .prepare("DELETE FROM applications WHERE project_id = ?")
        .run(&[json!("p1")])
        .unwrap();
    assert_eq!(removed.changes, 2);

    let left = db
        .prepare("SELECT * FROM applications WHERE project_id = ?")
        .all(&[json!("p1")]);
    assert!(left.is_empty());
    assert_eq!(db.snapshot("applications").len(), 1);
}

#[test]
fn test_join_keeps_driving_id() {
    let db = Database::in_memory();
    db.prepare("INSERT INTO users (id, name) VALUES (?, ?)")
        .run(&[json!("c1"), json!("Acme")])
        .unwrap();
    db.prepare("INSERT INTO projects (id, company_id, title) VALUES (?, ?, ?)")
        .run(&[json!("p1"), json!("c1"), json!("Site")])
        .unwrap();

    let row = db
        .prepare(
            "SELECT p.*, u.name as company_name FROM projects p
             JOIN users u ON p.company_id = u.id WHERE p.id = ?",
        )
        .get(&[json!("p1")])
        .unwrap();

    assert_eq!(row["id"], json!("p1"));
    assert_eq!(row["company_name"], json!("Acme"));
}

#[test]
fn test_like_wildcard() {
    let db = Database::in_memory();
    let insert = db.prepare("INSERT INTO projects (id, skills) VALUES (?, ?)");
    insert.run(&[json!("p1"), json!("Vue, reactjs, Go")]).unwrap();
    insert.run(&[json!("p2"), json!("Angular")]).unwrap();

    let rows = db
        .prepare("SELECT * FROM projects WHERE skills LIKE ?")
        .all(&[json!("%ReactJS%")]);
    assert_eq!(ids(&rows), vec!["p1"]);
}

#[test]
fn test_descending_order() {
    let db = Database::in_memory();
    let insert = db.prepare("INSERT INTO projects (id, created_at) VALUES (?, ?)");
    insert.run(&[json!("jan"), json!("2024-01-01")]).unwrap();
    insert.run(&[json!("mar"), json!("2024-03-01")]).unwrap();
    insert.run(&[json!("feb"), json!("2024-02-01")]).unwrap();

    let rows = db
        .prepare("SELECT * FROM projects ORDER BY created_at DESC")
        .all(&[]);
    assert_eq!(ids(&rows), vec!["mar", "feb", "jan"]);
}

#[test]
fn test_parameters_bind_once_for_every_record() {
    let db = Database::in_memory();
    let insert = db.prepare("INSERT INTO applications (id, project_id, student_id) VALUES (?, ?, ?)");
    insert.run(&[json!("a1"), json!("p1"), json!("s1")]).unwrap();
    insert.run(&[json!("a2"), json!("p1"), json!("s2")]).unwrap();
    insert.run(&[json!("a3"), json!("p2"), json!("s2")]).unwrap();

    let rows = db
        .prepare("SELECT * FROM applications WHERE project_id = ? AND student_id = ?")
        .all(&[json!("p1"), json!("s2")]);
    assert_eq!(ids(&rows), vec!["a2"]);
}

#[test]
fn test_fail_soft_and_missing_collections() {
    let db = Database::in_memory();

    assert!(db.prepare("SELECT * FROM nowhere").all(&[]).is_empty());
    assert!(db.prepare("SELEKT everything").get(&[]).is_none());
    assert_eq!(db.prepare("MERGE INTO x").run(&[]).unwrap().changes, 0);
    assert_eq!(
        db.prepare("DELETE FROM nowhere WHERE id = ?")
            .run(&[json!("x")])
            .unwrap()
            .changes,
        0
    );

    db.prepare("INSERT INTO messages (id) VALUES (?);")
        .run(&[json!("m1")])
        .unwrap();
    assert_eq!(db.snapshot("messages").len(), 1);
}

#[test]
fn test_mutations_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");

    {
        let db = Database::open(&path);
        db.prepare("INSERT INTO reviews (id, rating) VALUES (?, ?)")
            .run(&[json!("r1"), json!(4)])
            .unwrap();
    }

    let db = Database::open(&path);
    let review = db
        .prepare("SELECT * FROM reviews WHERE id = ?")
        .get(&[json!("r1")])
        .unwrap();
    assert_eq!(review["rating"], json!(4));

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(on_disk["users"].is_array());
    assert_eq!(on_disk["reviews"][0]["id"], json!("r1"));
}

#[test]
fn test_corrupt_document_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    std::fs::write(&path, "{ not json").unwrap();

    let db = Database::open(&path);

    assert_eq!(
        db.collection_names(),
        vec!["users", "projects", "applications", "submissions", "reviews"]
    );
    assert_eq!(db.record_count(), 0);
}

#[test]
fn test_accept_application_cascades_to_project() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.json");
    let db = Database::open(&path);

    db.prepare("INSERT INTO projects (id, title, status) VALUES (?, ?, ?)")
        .run(&[json!("P"), json!("Site"), json!("open")])
        .unwrap();
    db.prepare("INSERT INTO applications (id, project_id, status) VALUES (?, ?, ?)")
        .run(&[json!("X"), json!("P"), json!("pending")])
        .unwrap();

    let accepted = db
        .prepare("UPDATE applications SET status = ? WHERE id = ?")
        .run(&[json!("accepted"), json!("X")])
        .unwrap();
    assert_eq!(accepted.changes, 1);
    let started = db
        .prepare("UPDATE projects SET status = ? WHERE id = ?")
        .run(&[json!("in_progress"), json!("P")])
        .unwrap();
    assert_eq!(started.changes, 1);

    let reopened = Database::open(&path);
    let application = reopened
        .prepare("SELECT * FROM applications WHERE id = ?")
        .get(&[json!("X")])
        .unwrap();
    let project = reopened
        .prepare("SELECT * FROM projects WHERE id = ?")
        .get(&[json!("P")])
        .unwrap();
    assert_eq!(application["status"], json!("accepted"));
    assert_eq!(project["status"], json!("in_progress"));
}

#[test]
fn test_failed_write_reports_error_and_keeps_change() {
    let dir = tempdir().unwrap();
    let folder = dir.path().join("store");
    std::fs::create_dir(&folder).unwrap();
    let db = Database::open(folder.join("data.json"));
    std::fs::remove_dir_all(&folder).unwrap();

    let inserted = db
        .prepare("INSERT INTO users (id, name) VALUES (?, ?)")
        .run(&[json!("u1"), json!("Ada")]);
    assert!(matches!(inserted, Err(Error::IoError(_))));
    assert_eq!(db.snapshot("users").len(), 1);
    assert!(db
        .prepare("SELECT * FROM users WHERE id = ?")
        .get(&[json!("u1")])
        .is_some());

    let declared = db.exec("CREATE TABLE IF NOT EXISTS messages (id TEXT PRIMARY KEY)");
    assert!(matches!(declared, Err(Error::IoError(_))));
    assert!(db.collection_names().contains(&"messages".to_string()));
}

#[test]
fn test_skipped_fragments_keep_later_parameters_aligned() {
    let db = Database::in_memory();
    db.prepare("INSERT INTO users (id, name, status) VALUES (?, ?, ?)")
        .run(&[json!("c1"), json!("Acme"), json!("active")])
        .unwrap();
    let insert = db.prepare("INSERT INTO projects (id, company_id) VALUES (?, ?)");
    insert.run(&[json!("p1"), json!("c1")]).unwrap();
    insert.run(&[json!("p2"), json!("c1")]).unwrap();

    let joined = db
        .prepare(
            "SELECT p.*, u.name as company_name FROM projects p
             JOIN users u ON p.company_id = u.id AND u.status = ?
             WHERE p.id = ?",
        )
        .all(&[json!("active"), json!("p2")]);
    assert_eq!(ids(&joined), vec!["p2"]);
    assert_eq!(joined[0]["company_name"], json!("Acme"));

    let projected = db
        .prepare("SELECT p.*, COALESCE(p.note, ?) AS note FROM projects p WHERE p.id = ?")
        .all(&[json!("none"), json!("p1")]);
    assert_eq!(ids(&projected), vec!["p1"]);
}

#[test]
fn test_absent_parameter_matches_missing_field() {
    let db = Database::in_memory();
    db.prepare("INSERT INTO users (id, email) VALUES (?, ?)")
        .run(&[json!("u1"), json!("ada@mit.edu")])
        .unwrap();
    db.prepare("INSERT INTO users (id) VALUES (?)")
        .run(&[json!("u2")])
        .unwrap();

    let rows = db.prepare("SELECT * FROM users WHERE email = ?").all(&[]);
    assert_eq!(ids(&rows), vec!["u2"]);
}

#[test]
fn test_names_order_alphabetically() {
    let db = Database::in_memory();
    let insert = db.prepare("INSERT INTO users (id, name) VALUES (?, ?)");
    for name in ["Zeta", "Élan", "apple", "Apple"] {
        insert.run(&[json!(name), json!(name)]).unwrap();
    }

    let rows = db.prepare("SELECT * FROM users ORDER BY name").all(&[]);
    assert_eq!(ids(&rows), vec!["apple", "Apple", "Élan", "Zeta"]);
}
