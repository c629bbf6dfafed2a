use roster_server::roster::{FailureCause, PgRosterStore, RosterError, RosterService};
use roster_server::test_support::{TestDatabase, TestFixtures};

macro_rules! test_database {
    ($name:literal) => {
        match TestDatabase::new_from_env().await {
            Ok(db) => db,
            Err(err) if err.is_unavailable() => {
                eprintln!("skipping {}: {err}", $name);
                return;
            }
            Err(err) => panic!("failed to provision test database: {err:?}"),
        }
    };
}

fn emails(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

async fn classroom(test_db: &TestDatabase) -> RosterService<PgRosterStore> {
    TestFixtures::new(test_db.pool())
        .seed_classroom()
        .await
        .expect("seed classroom");
    RosterService::new(PgRosterStore::new(test_db.pool_clone()))
}

#[tokio::test]
async fn failed_registration_leaves_no_partial_edges() {
    let test_db = test_database!("partial registration test");
    let service = classroom(&test_db).await;

    // s4 is new to t3 but s1 is already enrolled, so nothing may be written.
    let err = service
        .register("t3@test.com", &emails(&["s4@test.com", "s1@test.com"]))
        .await
        .expect_err("duplicate registration must fail");
    assert!(matches!(
        err,
        RosterError::Registration(FailureCause::AlreadyRegistered(ref dupes))
            if dupes == &emails(&["s1@test.com"])
    ));

    let err = service
        .register("t1@test.com", &emails(&["s4@test.com", "s9@test.com"]))
        .await
        .expect_err("unknown student must fail");
    assert!(matches!(
        err.cause(),
        FailureCause::StudentsNotFound {
            requested: 2,
            missing: 1
        }
    ));

    let fixtures = TestFixtures::new(test_db.pool());
    assert_eq!(
        fixtures.roster("t3@test.com").await.expect("roster"),
        emails(&["s1@test.com", "s2@test.com"])
    );
    assert!(fixtures.roster("t1@test.com").await.expect("roster").is_empty());

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn concurrent_duplicate_registration_admits_one() {
    let test_db = test_database!("concurrent registration test");
    let service = classroom(&test_db).await;
    let students = emails(&["s4@test.com", "s5@test.com"]);

    let first_service = service.clone();
    let first_students = students.clone();
    let first = tokio::spawn(async move {
        first_service.register("t1@test.com", &first_students).await
    });
    let second_service = service.clone();
    let second_students = students.clone();
    let second = tokio::spawn(async move {
        second_service.register("t1@test.com", &second_students).await
    });

    let outcomes = [
        first.await.expect("first task"),
        second.await.expect("second task"),
    ];
    let succeeded = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(succeeded, 1, "outcomes: {outcomes:?}");

    let roster = TestFixtures::new(test_db.pool())
        .roster("t1@test.com")
        .await
        .expect("roster");
    assert_eq!(roster, students);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn removing_entities_cascades_to_edges() {
    let test_db = test_database!("cascade delete test");
    let service = classroom(&test_db).await;

    assert!(
        service
            .store()
            .remove_student("s1@test.com")
            .await
            .expect("remove student")
    );
    assert_eq!(
        service
            .common_students(&emails(&["t2@test.com", "t3@test.com"]))
            .await
            .expect("common students"),
        emails(&["s2@test.com"])
    );

    assert!(
        service
            .store()
            .remove_teacher("t3@test.com")
            .await
            .expect("remove teacher")
    );
    assert!(
        !service
            .store()
            .remove_teacher("t3@test.com")
            .await
            .expect("remove missing teacher")
    );

    let err = service
        .common_students(&emails(&["t3@test.com"]))
        .await
        .expect_err("deleted teacher must not resolve");
    assert!(matches!(
        err,
        RosterError::CommonStudents(FailureCause::TeacherNotFound(_))
    ));

    // s1 is gone, so registering it anywhere fails.
    let err = service
        .register("t1@test.com", &emails(&["s1@test.com"]))
        .await
        .expect_err("deleted student must not register");
    assert!(matches!(err, RosterError::Registration(_)));

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn suspension_filters_notification_recipients() {
    let test_db = test_database!("suspension recipients test");
    let service = classroom(&test_db).await;

    service.suspend("s2@test.com").await.expect("suspend");
    service.suspend("s2@test.com").await.expect("suspend again");
    assert!(
        TestFixtures::new(test_db.pool())
            .is_suspended("s2@test.com")
            .await
            .expect("flag")
    );

    let recipients = service
        .recipients_for("t2@test.com", "hello @s4@test.com and @nobody@test.com")
        .await
        .expect("recipients");
    assert_eq!(
        recipients,
        emails(&["s1@test.com", "s3@test.com", "s4@test.com"])
    );

    service.unsuspend("s2@test.com").await.expect("unsuspend");
    let recipients = service
        .recipients_for("t3@test.com", "")
        .await
        .expect("recipients");
    assert_eq!(recipients, emails(&["s1@test.com", "s2@test.com"]));

    let err = service
        .suspend("s0@test.com")
        .await
        .expect_err("unknown student");
    assert!(matches!(
        err,
        RosterError::Suspension(FailureCause::StudentNotFound(_))
    ));

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn provisioning_helpers_are_idempotent() {
    let test_db = test_database!("provisioning test");
    let store = PgRosterStore::new(test_db.pool_clone());

    assert!(store.add_teacher("t9@test.com").await.expect("add teacher"));
    assert!(!store.add_teacher("t9@test.com").await.expect("re-add teacher"));
    assert!(store.add_student("s9@test.com", true).await.expect("add student"));
    assert!(!store.add_student("s9@test.com", false).await.expect("re-add student"));

    assert!(
        TestFixtures::new(test_db.pool())
            .is_suspended("s9@test.com")
            .await
            .expect("flag")
    );

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn teacher_and_student_may_share_an_email() {
    let test_db = test_database!("shared email test");
    let service = classroom(&test_db).await;
    let store = service.store();

    assert!(store.add_teacher("s4@test.com").await.expect("add teacher"));
    service
        .register("s4@test.com", &emails(&["s4@test.com", "s5@test.com"]))
        .await
        .expect("register");
    assert_eq!(
        service
            .common_students(&emails(&["s4@test.com"]))
            .await
            .expect("common students"),
        emails(&["s4@test.com", "s5@test.com"])
    );

    // Suspending the student leaves the teacher usable.
    service.suspend("s4@test.com").await.expect("suspend");
    assert_eq!(
        service
            .recipients_for("s4@test.com", "")
            .await
            .expect("recipients"),
        emails(&["s5@test.com"])
    );

    // Removing the student record keeps the teacher and the rest of its roster.
    assert!(store.remove_student("s4@test.com").await.expect("remove student"));
    assert_eq!(
        service
            .common_students(&emails(&["s4@test.com"]))
            .await
            .expect("common students"),
        emails(&["s5@test.com"])
    );

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn concurrent_suspension_updates_serialize() {
    let test_db = test_database!("concurrent suspension test");
    let service = classroom(&test_db).await;

    let mut handles = Vec::new();
    for round in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            if round % 2 == 0 {
                service.suspend("s1@test.com").await
            } else {
                service.unsuspend("s1@test.com").await
            }
        }));
    }

    for handle in handles {
        handle
            .await
            .expect("suspension task")
            .expect("suspension update");
    }

    // Whichever update ran last wins; the row is never left unreadable or
    // duplicated.
    let suspended = TestFixtures::new(test_db.pool())
        .is_suspended("s1@test.com")
        .await
        .expect("flag");
    let recipients = service
        .recipients_for("t3@test.com", "")
        .await
        .expect("recipients");
    if suspended {
        assert_eq!(recipients, emails(&["s2@test.com"]));
    } else {
        assert_eq!(recipients, emails(&["s1@test.com", "s2@test.com"]));
    }

    test_db.close().await.expect("failed to drop test database");
}
