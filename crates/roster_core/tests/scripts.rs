use roster_core::{
    run_member_query, run_team_demo, ContextError, Criteria, Member, NameMatch,
    PersistenceContext, PersistenceUnit, QueryForm, RepoError, ScriptError, Team, TeamDemo,
};
use std::path::Path;

fn file_unit(dir: &Path) -> PersistenceUnit {
    PersistenceUnit::file("hello", dir.join("roster.db"))
}

fn count_rows(unit: &PersistenceUnit) -> (usize, usize) {
    let mut ctx = PersistenceContext::open(unit).unwrap();
    ctx.begin_transaction().unwrap();
    let teams = ctx.query(&Criteria::<Team>::new()).unwrap().len();
    let members = ctx.query(&Criteria::<Member>::new()).unwrap().len();
    ctx.close().unwrap();
    (teams, members)
}

#[test]
fn team_demo_prints_member_and_commits() {
    let dir = tempfile::tempdir().unwrap();
    let unit = file_unit(dir.path());
    let ctx = PersistenceContext::open(&unit).unwrap();

    let mut out = Vec::new();
    let report = run_team_demo(ctx, &TeamDemo::default(), &mut out).unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "member=member1\n");
    assert_eq!(report.team.name, "TeamA");
    assert_eq!(report.member.name, "member1");
    assert_eq!(report.member.team_id, report.team.id);
    assert_eq!(report.roster, vec!["member1".to_string()]);
    assert_eq!(count_rows(&unit), (1, 1));
}

#[test]
fn team_demo_failure_rolls_back_earlier_writes() {
    let dir = tempfile::tempdir().unwrap();
    let unit = file_unit(dir.path());
    let ctx = PersistenceContext::open(&unit).unwrap();

    let demo = TeamDemo {
        team_name: "TeamA".to_string(),
        member_name: " ".to_string(),
    };
    let mut out = Vec::new();
    let err = run_team_demo(ctx, &demo, &mut out).unwrap_err();

    assert!(matches!(
        err,
        ScriptError::Context(ContextError::Repo(RepoError::Validation(_)))
    ));
    assert!(out.is_empty());
    assert_eq!(count_rows(&unit), (0, 0));
}

#[test]
fn member_query_forms_return_identical_rows() {
    let dir = tempfile::tempdir().unwrap();
    let unit = file_unit(dir.path());

    let mut ctx = PersistenceContext::open(&unit).unwrap();
    ctx.begin_transaction().unwrap();
    for name in ["kim", "lee", "kimchi", "kim"] {
        ctx.persist(&mut Member::new(name)).unwrap();
    }
    ctx.commit().unwrap();
    ctx.close().unwrap();

    for matcher in [
        NameMatch::Exact("kim".to_string()),
        NameMatch::Contains("kim".to_string()),
    ] {
        let mut text_out = Vec::new();
        let by_text = run_member_query(
            PersistenceContext::open(&unit).unwrap(),
            QueryForm::Text,
            &matcher,
            &mut text_out,
        )
        .unwrap();

        let mut criteria_out = Vec::new();
        let by_criteria = run_member_query(
            PersistenceContext::open(&unit).unwrap(),
            QueryForm::Criteria,
            &matcher,
            &mut criteria_out,
        )
        .unwrap();

        assert_eq!(by_text, by_criteria);
        assert_eq!(text_out, criteria_out);
    }

    let mut out = Vec::new();
    let exact = run_member_query(
        PersistenceContext::open(&unit).unwrap(),
        QueryForm::Criteria,
        &NameMatch::Exact("kim".to_string()),
        &mut out,
    )
    .unwrap();
    assert_eq!(exact.len(), 2);
    assert_eq!(String::from_utf8(out).unwrap(), "member=kim\nmember=kim\n");
}

#[test]
fn member_query_on_empty_store_finds_nothing() {
    let ctx = PersistenceContext::open(&PersistenceUnit::in_memory("hello")).unwrap();
    let mut out = Vec::new();
    let found = run_member_query(
        ctx,
        QueryForm::Criteria,
        &NameMatch::Exact("kim".to_string()),
        &mut out,
    )
    .unwrap();
    assert!(found.is_empty());
    assert!(out.is_empty());
}
