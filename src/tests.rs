use crate::{
    actors::{
        reporter::{Flush, ProgressSink, Reporter},
        sweeper::{Sweep, Sweeper},
    },
    checks::{
        site::{Site, Sites, SpiderType},
        store::{FileStore, MemoryStore, Selection, SiteStore},
    },
    evaluators::{
        fetcher::{CurlTransport, Response, TlsVerification, Transport},
        keyword::KeywordPolicy,
    },
    products::{
        progress::{Progress, Progresses},
        unexpected::{FetchError, StoreError, SweepError},
        verdict::Freshness,
    },
};
use actix::prelude::*;
use chrono::{Duration, Local};
use std::{collections::HashMap, sync::Arc, sync::Mutex, thread, time};


/// Scripted behavior of a single URL
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Respond(Response),
    Fail(FetchError),
    /// Untrusted certificate while verification is enabled
    Untrusted(Option<Response>),
    /// Nth request of the URL plays nth script, the last one repeats
    Sequence(Vec<Script>),
}


impl Script {
    fn play(&self, url: &str, tls: TlsVerification, attempt: usize) -> Result<Response, FetchError> {
        match self {
            Script::Respond(response) => Ok(response.clone()),
            Script::Fail(err) => Err(err.clone()),
            Script::Untrusted(response) => {
                match (tls, response) {
                    (TlsVerification::Disabled, Some(response)) => Ok(response.clone()),
                    _ => {
                        Err(FetchError::UntrustedCertificate(
                            url.to_string(),
                            "unable to get local issuer certificate".to_string(),
                        ))
                    }
                }
            }
            Script::Sequence(scripts) => {
                match scripts.get(attempt).or_else(|| scripts.last()) {
                    Some(script) => script.play(url, tls, attempt),
                    None => Err(FetchError::Transport(url.to_string(), "empty script".to_string())),
                }
            }
        }
    }
}


/// In-process transport answering from scripts, recording every request
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    routes: HashMap<String, Script>,
    calls: Mutex<Vec<(String, TlsVerification)>>,
}


impl FakeTransport {
    pub(crate) fn new() -> FakeTransport {
        FakeTransport::default()
    }


    pub(crate) fn route(mut self, url: &str, script: Script) -> FakeTransport {
        self.routes.insert(url.to_string(), script);
        self
    }


    pub(crate) fn ok(status_code: u32, body: &str) -> Script {
        Script::Respond(Response {
            status_code,
            body: body.to_string(),
        })
    }


    pub(crate) fn failing(err: FetchError) -> Script {
        Script::Fail(err)
    }


    pub(crate) fn untrusted_then(status_code: u32, body: &str) -> Script {
        Script::Untrusted(Some(Response {
            status_code,
            body: body.to_string(),
        }))
    }


    pub(crate) fn always_untrusted() -> Script {
        Script::Untrusted(None)
    }


    pub(crate) fn sequence(scripts: Vec<Script>) -> Script {
        Script::Sequence(scripts)
    }


    pub(crate) fn calls(&self) -> Vec<(String, TlsVerification)> {
        self.calls.lock().unwrap().clone()
    }


    pub(crate) fn calls_of(&self, url: &str) -> usize {
        self.calls().iter().filter(|(called, _)| called == url).count()
    }
}


impl Transport for FakeTransport {
    fn get(&self, url: &str, tls: TlsVerification) -> Result<Response, FetchError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((url.to_string(), tls));
            calls.iter().filter(|(called, _)| called == url).count() - 1
        };
        match self.routes.get(url) {
            Some(script) => script.play(url, tls, attempt),
            None => {
                Err(FetchError::Connection(
                    url.to_string(),
                    "Connection refused".to_string(),
                ))
            }
        }
    }
}


/// Progress sink keeping everything in memory
#[derive(Debug, Default)]
pub(crate) struct CollectingSink(Mutex<Progresses>);


impl CollectingSink {
    pub(crate) fn progresses(&self) -> Progresses {
        self.0.lock().unwrap().clone()
    }


    pub(crate) fn of(&self, domain: &str) -> Progresses {
        self.progresses()
            .into_iter()
            .filter(|progress| progress.domain == domain)
            .collect()
    }
}


impl ProgressSink for CollectingSink {
    fn report(&self, progress: Progress) {
        self.0.lock().unwrap().push(progress);
    }
}


/// Memory store refusing to persist one record, or to list anything
#[derive(Debug)]
struct BrokenStore {
    inner: MemoryStore,
    unsaveable: Option<u64>,
    unlistable: bool,
}


impl SiteStore for BrokenStore {
    fn list_all(&self) -> Result<Sites, StoreError> {
        if self.unlistable {
            return Err(StoreError::Unavailable("listing disabled".to_string()));
        }
        self.inner.list_all()
    }


    fn save(&self, site: &Site) -> Result<(), StoreError> {
        if self.unsaveable == Some(site.id) {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.save(site)
    }
}


struct Fixture {
    store: Arc<MemoryStore>,
    transport: Arc<FakeTransport>,
    sink: Arc<CollectingSink>,
}


impl Fixture {
    fn new(sites: Sites, transport: FakeTransport) -> Fixture {
        Fixture {
            store: Arc::new(MemoryStore::new(sites)),
            transport: Arc::new(transport),
            sink: Arc::new(CollectingSink::default()),
        }
    }


    fn sweeper(&self) -> Sweeper {
        Sweeper::new(self.store.clone(), self.transport.clone(), self.sink.clone())
            .with_concurrency(4)
    }


    fn site(&self, id: u64) -> Site {
        self.store.get(id).unwrap()
    }
}


fn site(id: u64, domain: &str) -> Site {
    Site::new(id, domain)
}


fn page_updated(date: &str) -> String {
    format!(
        "<html><body><h1>News</h1><div class=\"meta\"><span class=\"updated\">{}</span></div></body></html>",
        date
    )
}


fn days_ago(days: i64) -> String {
    (Local::now().naive_local() - Duration::days(days))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}


#[test]
fn test_content_site_online_only_with_code_200() {
    let fixture = Fixture::new(
        vec![
            site(1, "https://ok.example"),
            site(2, "https://missing.example"),
            site(3, "https://broken.example"),
        ],
        FakeTransport::new()
            .route("https://ok.example", FakeTransport::ok(200, "<html><body>hello</body></html>"))
            .route("https://missing.example", FakeTransport::ok(404, "<html><body>not found</body></html>"))
            .route("https://broken.example", FakeTransport::ok(500, "")),
    );
    let report = fixture.sweeper().run(Selection::All).unwrap();

    assert!(fixture.site(1).is_online);
    assert!(!fixture.site(2).is_online);
    assert!(!fixture.site(3).is_online);

    // full sweep over 3 sites, retry sweep over 2 offline ones:
    assert_eq!(report.evaluated, 5);
    assert_eq!(report.online, 1);
    assert_eq!(fixture.sink.progresses().len(), 5);
    assert_eq!(fixture.transport.calls_of("https://ok.example"), 1);
    assert_eq!(fixture.transport.calls_of("https://missing.example"), 2);
}


#[test]
fn test_api_site_online_only_with_textual_payload() {
    let api = |id, domain: &str| {
        Site {
            spider_type: SpiderType::Api,
            path: Some("/v1/status".to_string()),
            ..site(id, domain)
        }
    };
    let fixture = Fixture::new(
        vec![
            api(1, "https://json.example"),
            api(2, "https://empty.example"),
            api(3, "https://blank.example"),
            api(4, "https://erroring.example"),
        ],
        FakeTransport::new()
            .route("https://json.example/v1/status", FakeTransport::ok(200, "{\"status\": \"up\"}"))
            .route("https://empty.example/v1/status", FakeTransport::ok(200, ""))
            .route("https://blank.example/v1/status", FakeTransport::ok(200, "<html><body> \n </body></html>"))
            .route("https://erroring.example/v1/status", FakeTransport::ok(503, "{\"error\": \"busy\"}")),
    );
    fixture.sweeper().with_concurrency(1).run(Selection::All).unwrap();

    assert!(fixture.site(1).is_online);
    assert!(!fixture.site(2).is_online);
    assert!(!fixture.site(3).is_online);
    assert!(fixture.site(4).is_online);
}


#[test]
fn test_site_without_freshness_rule_is_never_new() {
    let fixture = Fixture::new(
        vec![Site {
            is_new: true,
            ..site(1, "https://plain.example")
        }],
        FakeTransport::new().route(
            "https://plain.example",
            FakeTransport::ok(200, &page_updated(&days_ago(0))),
        ),
    );
    fixture.sweeper().run(Selection::All).unwrap();

    let stored = fixture.site(1);
    assert!(stored.is_online);
    assert!(!stored.is_new);
    assert_eq!(stored.last_updated_at, None);
    assert_eq!(fixture.sink.of("https://plain.example")[0].freshness, Freshness::NotChecked);
}


#[test]
fn test_freshness_window() {
    let with_date = |id, domain: &str| {
        Site {
            date_xpath: Some("//span[@class='updated']".to_string()),
            ..site(id, domain)
        }
    };
    let yesterday = days_ago(1);
    let fixture = Fixture::new(
        vec![
            with_date(1, "https://fresh.example"),
            with_date(2, "https://stale.example"),
        ],
        FakeTransport::new()
            .route("https://fresh.example", FakeTransport::ok(200, &page_updated(&yesterday)))
            .route("https://stale.example", FakeTransport::ok(200, &page_updated(&days_ago(3)))),
    );
    let report = fixture.sweeper().run(Selection::All).unwrap();

    let fresh = fixture.site(1);
    assert!(fresh.is_online);
    assert!(fresh.is_new);
    assert_eq!(fresh.last_updated_at, Some(yesterday));

    let stale = fixture.site(2);
    assert!(stale.is_online);
    assert!(!stale.is_new);
    assert!(stale.last_updated_at.is_some());
    assert_eq!(report.fresh, 1);
    assert_eq!(report.evaluated, 2);
}


#[test]
fn test_malformed_date_keeps_previous_content_date() {
    let previous = "01.03.2024 08:00".to_string();
    let fixture = Fixture::new(
        vec![Site {
            date_xpath: Some("//span[@class='updated']".to_string()),
            date_format: Some("d.m.Y H:i".to_string()),
            last_updated_at: Some(previous.clone()),
            is_new: true,
            ..site(1, "https://garbled.example")
        }],
        FakeTransport::new().route(
            "https://garbled.example",
            FakeTransport::ok(200, &page_updated("sometime last week")),
        ),
    );
    fixture.sweeper().run(Selection::All).unwrap();

    let stored = fixture.site(1);
    assert!(stored.is_online);
    assert!(!stored.is_new);
    assert_eq!(stored.last_updated_at, Some(previous));

    let progress = &fixture.sink.of("https://garbled.example")[0];
    assert_eq!(progress.freshness, Freshness::Stale);
    assert!(progress.error.as_deref().unwrap_or_default().contains("sometime last week"));
}


#[test]
fn test_missing_keyword_overrides_status() {
    let with_keyword = |id, domain: &str| {
        Site {
            need_string: Some("maintenance".to_string()),
            ..site(id, domain)
        }
    };
    let transport = || {
        FakeTransport::new()
            .route("https://plain.example", FakeTransport::ok(200, "<html><body>All good</body></html>"))
            .route(
                "https://paused.example",
                FakeTransport::ok(503, "<html><body>Planned maintenance</body></html>"),
            )
    };
    let sites = || {
        vec![
            with_keyword(1, "https://plain.example"),
            with_keyword(2, "https://paused.example"),
        ]
    };

    let overwriting = Fixture::new(sites(), transport());
    overwriting.sweeper().run(Selection::All).unwrap();
    assert!(!overwriting.site(1).is_online);
    assert!(overwriting.site(2).is_online);

    let requiring = Fixture::new(sites(), transport());
    requiring
        .sweeper()
        .with_keyword_policy(KeywordPolicy::Require)
        .run(Selection::All)
        .unwrap();
    assert!(!requiring.site(1).is_online);
    assert!(!requiring.site(2).is_online);
}


#[test]
fn test_untrusted_certificate_gets_normal_evaluation() {
    let fixture = Fixture::new(
        vec![Site {
            date_xpath: Some("//span[@class='updated']".to_string()),
            ..site(1, "https://self-signed.example")
        }],
        FakeTransport::new().route(
            "https://self-signed.example",
            FakeTransport::untrusted_then(200, &page_updated(&days_ago(1))),
        ),
    );
    fixture.sweeper().run(Selection::All).unwrap();

    let stored = fixture.site(1);
    assert!(stored.is_online);
    assert!(stored.is_new);
    assert_eq!(
        fixture.transport.calls(),
        vec![
            ("https://self-signed.example".to_string(), TlsVerification::Enabled),
            ("https://self-signed.example".to_string(), TlsVerification::Disabled),
        ]
    );
}


#[test]
fn test_retry_sweep_recovers_transient_failure() {
    let fixture = Fixture::new(
        vec![site(1, "https://flaky.example"), site(2, "https://stable.example")],
        FakeTransport::new()
            .route(
                "https://flaky.example",
                FakeTransport::sequence(vec![
                    FakeTransport::failing(FetchError::Timeout("https://flaky.example".to_string(), 30)),
                    FakeTransport::ok(200, "<html><body>back</body></html>"),
                ]),
            )
            .route("https://stable.example", FakeTransport::ok(200, "<html><body>up</body></html>")),
    );
    let report = fixture.sweeper().run(Selection::All).unwrap();

    assert!(fixture.site(1).is_online);
    assert!(fixture.site(2).is_online);
    assert_eq!(report.evaluated, 3);

    let flaky = fixture.sink.of("https://flaky.example");
    assert_eq!(flaky.len(), 2);
    assert!(!flaky[0].is_online);
    assert!(flaky[0].error.is_some());
    assert!(flaky[1].is_online);
    assert_eq!(fixture.transport.calls_of("https://stable.example"), 1);
}


#[test]
fn test_filtered_sweeps_never_retry() {
    let failing = || {
        FakeTransport::new()
            .route("https://down.example", FakeTransport::ok(502, ""))
            .route("https://other.example", FakeTransport::ok(200, "<html><body>up</body></html>"))
    };
    let sites = || vec![site(1, "https://down.example"), site(2, "https://other.example")];

    let failed = Fixture::new(sites(), failing());
    let report = failed.sweeper().run(Selection::Failed).unwrap();
    assert_eq!(report.evaluated, 2);
    assert_eq!(failed.transport.calls_of("https://down.example"), 1);

    let domain = Fixture::new(sites(), failing());
    let report = domain
        .sweeper()
        .run(Selection::Domain("https://down.example".to_string()))
        .unwrap();
    assert_eq!(report.evaluated, 1);
    assert_eq!(domain.transport.calls().len(), 1);
    assert!(!domain.site(2).is_online);
}


#[test]
fn test_repeated_sweeps_persist_identical_verdicts() {
    let sites = vec![
        Site {
            date_xpath: Some("span.updated".to_string()),
            date_format: Some("Y-m-d H:i:s".to_string()),
            ..site(1, "https://news.example")
        },
        Site {
            need_string: Some("Welcome".to_string()),
            ..site(2, "https://shop.example")
        },
        site(3, "https://gone.example"),
        Site {
            date_xpath: Some("span.updated".to_string()),
            date_format: Some("d.m.Y".to_string()),
            ..site(4, "https://daily.example")
        },
    ];
    let today = Local::now().format("%d.%m.%Y").to_string();
    let fixture = Fixture::new(
        sites,
        FakeTransport::new()
            .route("https://news.example", FakeTransport::ok(200, &page_updated(&days_ago(1))))
            .route("https://daily.example", FakeTransport::ok(200, &page_updated(&today)))
            .route("https://shop.example", FakeTransport::ok(200, "<html><body>Welcome!</body></html>"))
            .route("https://gone.example", FakeTransport::ok(410, "")),
    );
    let sweeper = fixture.sweeper();

    sweeper.run(Selection::All).unwrap();
    let first = fixture.store.list_all().unwrap();
    // date-only formats borrow the time of day while parsing, it must not leak into the record
    thread::sleep(time::Duration::from_millis(1100));
    sweeper.run(Selection::All).unwrap();
    let second = fixture.store.list_all().unwrap();

    assert_eq!(first, second);
    assert!(first[0].is_new);
    assert!(first[1].is_online);
    assert!(!first[2].is_online);
    assert!(first[3].is_new);
    assert_eq!(first[3].last_updated_at, Some(today));
}


#[test]
fn test_persistence_failure_affects_single_site() {
    let store = Arc::new(BrokenStore {
        inner: MemoryStore::new(vec![
            site(1, "https://one.example"),
            site(2, "https://two.example"),
            site(3, "https://three.example"),
        ]),
        unsaveable: Some(2),
        unlistable: false,
    });
    let sink = Arc::new(CollectingSink::default());
    let transport = FakeTransport::new()
        .route("https://one.example", FakeTransport::ok(200, "<html><body>1</body></html>"))
        .route("https://two.example", FakeTransport::ok(200, "<html><body>2</body></html>"))
        .route("https://three.example", FakeTransport::ok(200, "<html><body>3</body></html>"));

    let report = Sweeper::new(store.clone(), Arc::new(transport), sink.clone())
        .run(Selection::All)
        .unwrap();

    assert!(store.inner.get(1).unwrap().is_online);
    assert!(!store.inner.get(2).unwrap().is_online);
    assert!(store.inner.get(3).unwrap().is_online);

    // unsaved site stays failed, so the retry sweep picks it up again:
    assert_eq!(report.evaluated, 4);
    assert_eq!(report.unsaved, 2);
    let unsaved = sink.of("https://two.example");
    assert!(unsaved.iter().all(|progress| progress.unsaved && progress.is_online));
}


#[test]
fn test_listing_failure_stops_the_run() {
    let store = Arc::new(BrokenStore {
        inner: MemoryStore::default(),
        unsaveable: None,
        unlistable: true,
    });
    let sink = Arc::new(CollectingSink::default());
    let result = Sweeper::new(store, Arc::new(FakeTransport::new()), sink.clone()).run(Selection::All);
    assert!(matches!(result, Err(SweepError::Listing(..))));
    assert!(sink.progresses().is_empty());
}


#[test]
fn test_sweep_over_file_store_and_http() {
    let mut server = mockito::Server::new();
    let today = Local::now().format("%d.%m.%Y").to_string();
    let news = server
        .mock("GET", "/")
        .with_status(200)
        .with_body(page_updated(&today))
        .expect(1)
        .create();
    let down = server
        .mock("GET", "/down")
        .with_status(503)
        .with_body("Service Unavailable")
        .expect(2)
        .create();
    let misplaced = server.mock("GET", "/misplaced").expect(0).create();

    let dir = tempfile::tempdir().unwrap();
    let sites = vec![
        Site {
            date_xpath: Some("div.meta > span.updated".to_string()),
            date_format: Some("d.m.Y".to_string()),
            ..site(1, &server.url())
        },
        site(2, &format!("{}/down", server.url())),
    ];
    for site in &sites {
        std::fs::write(
            dir.path().join(format!("{}.json", site.id)),
            serde_json::to_string_pretty(site).unwrap(),
        )
        .unwrap();
    }
    // neither record can be saved back under its id, both stay out of the sweep
    let stray = site(5, &format!("{}/misplaced", server.url()));
    std::fs::write(dir.path().join("news.json"), serde_json::to_string(&stray).unwrap()).unwrap();
    std::fs::write(dir.path().join("9.json"), "{ \"id\": 9,").unwrap();

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let sink = Arc::new(CollectingSink::default());
    let report = Sweeper::new(store.clone(), Arc::new(CurlTransport::new(5, 5, None)), sink.clone())
        .with_concurrency(2)
        .run(Selection::All)
        .unwrap();

    news.assert();
    down.assert();
    misplaced.assert();
    assert_eq!(report.evaluated, 3);
    assert_eq!(report.unsaved, 0);

    let stored = store.list_all().unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].is_online);
    assert!(stored[0].is_new);
    assert_eq!(stored[0].last_updated_at, Some(today));
    assert!(!stored[1].is_online);
    assert!(!stored[1].is_new);
}


#[actix_rt::test]
async fn test_actors_sweep_and_flush() {
    let store = Arc::new(MemoryStore::new(vec![
        site(1, "https://up.example"),
        site(2, "https://down.example"),
    ]));
    let transport = Arc::new(
        FakeTransport::new()
            .route("https://up.example", FakeTransport::ok(200, "<html><body>up</body></html>")),
    );
    let reporter = SyncArbiter::start(1, Reporter::default);
    let sweeper = Sweeper::new(store.clone(), transport, Arc::new(reporter.clone()));
    let sweeper = SyncArbiter::start(1, move || sweeper.clone());

    let report = sweeper
        .send(Sweep(Selection::All))
        .await
        .unwrap()
        .unwrap();
    let reported = reporter.send(Flush).await.unwrap();

    assert_eq!(report.evaluated, 3);
    assert_eq!(reported, report);
    assert!(store.get(1).unwrap().is_online);
    assert!(!store.get(2).unwrap().is_online);
}
