use crate::{
    actors::reporter::ProgressSink,
    checks::{
        site::Site,
        store::{Selection, SiteStore},
    },
    configuration::DEFAULT_CONCURRENCY,
    evaluators::{evaluate_site, fetcher::Transport, keyword::KeywordPolicy},
    products::{
        progress::{Progress, SweepReport},
        unexpected::SweepError,
    },
    *,
};
use actix::prelude::*;
use chrono::Local;
use rayon::prelude::*;
use std::{fmt, sync::Arc};


/// One sweep of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Sweep over the requested selection
    Full(Selection),

    /// Sweep over sites that are offline after the full sweep
    RetryFailed,
}


impl Phase {
    /// Sites this phase goes through
    pub fn selection(&self) -> Selection {
        match self {
            Phase::Full(selection) => selection.clone(),
            Phase::RetryFailed => Selection::Failed,
        }
    }


    /// Phase that follows this one. Only a full sweep over all sites gets a retry.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Full(Selection::All) => Some(Phase::RetryFailed),
            Phase::Full(_) | Phase::RetryFailed => None,
        }
    }
}


impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Full(selection) => write!(f, "sweep over {}", selection),
            Phase::RetryFailed => write!(f, "retry sweep over failed sites"),
        }
    }
}


/// Sweeper actor evaluates and persists selected sites in a bounded worker pool
#[derive(Clone)]
pub struct Sweeper {
    store: Arc<dyn SiteStore>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ProgressSink>,
    concurrency: usize,
    policy: KeywordPolicy,
}


/// Run over given selection
#[derive(Message, Debug, Clone)]
#[rtype(result = "Result<SweepReport, SweepError>")]
pub struct Sweep(pub Selection);


impl Sweeper {
    /// New sweeper with default concurrency and keyword policy
    pub fn new(
        store: Arc<dyn SiteStore>,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ProgressSink>,
    ) -> Sweeper {
        Sweeper {
            store,
            transport,
            sink,
            concurrency: DEFAULT_CONCURRENCY,
            policy: KeywordPolicy::default(),
        }
    }


    /// Set worker pool size. 1 evaluates sites one by one.
    pub fn with_concurrency(self, concurrency: usize) -> Sweeper {
        Sweeper {
            concurrency: concurrency.max(1),
            ..self
        }
    }


    /// Set required substring policy
    pub fn with_keyword_policy(self, policy: KeywordPolicy) -> Sweeper {
        Sweeper { policy, ..self }
    }


    /// Run the full sweep and its follow up phases
    pub fn run(&self, selection: Selection) -> Result<SweepReport, SweepError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|index| format!("sweeper-{}", index))
            .build()
            .map_err(|err| SweepError::WorkerPool(err.to_string()))?;

        let mut total = SweepReport::default();
        let mut phase = Some(Phase::Full(selection));
        while let Some(current) = phase {
            let report = pool.install(|| self.run_phase(&current))?;
            info!(
                "Finished {}: evaluated: {}, online: {}, offline: {}, fresh: {}, unsaved: {}",
                current,
                report.evaluated,
                report.online,
                report.offline(),
                report.fresh,
                report.unsaved
            );
            total = total.merge(report);
            phase = current.next();
        }
        Ok(total)
    }


    /// Returns once every verdict of the phase is persisted (or failed to)
    fn run_phase(&self, phase: &Phase) -> Result<SweepReport, SweepError> {
        let selection = phase.selection();
        let sites = self
            .store
            .select(&selection)
            .map_err(|err| SweepError::Listing(selection.to_string(), err))?;
        info!("Starting {} ({} sites)", phase, sites.len());

        Ok(sites
            .par_iter()
            .map(|site| {
                let progress = self.check(site);
                self.sink.report(progress.clone());
                progress
            })
            .fold(SweepReport::default, |report, progress| {
                report.account(&progress)
            })
            .reduce(SweepReport::default, SweepReport::merge))
    }


    /// Evaluate and persist a single site
    fn check(&self, site: &Site) -> Progress {
        let now = Local::now().naive_local();
        let verdict = evaluate_site(self.transport.as_ref(), site, self.policy, now);
        let mut record = site.clone();
        verdict.apply_to(&mut record);
        let progress = Progress::new(&site.domain, &verdict);
        match self.store.save(&record) {
            Ok(()) => progress,
            Err(err) => {
                error!("Couldn't persist verdict of: {}. {}", site.domain, err);
                progress.unsaved(err.to_string())
            }
        }
    }
}


impl fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sweeper")
            .field("concurrency", &self.concurrency)
            .field("policy", &self.policy)
            .finish()
    }
}


impl Handler<Sweep> for Sweeper {
    type Result = Result<SweepReport, SweepError>;

    fn handle(&mut self, sweep: Sweep, _ctx: &mut Self::Context) -> Self::Result {
        self.run(sweep.0)
    }
}


impl Actor for Sweeper {
    type Context = SyncContext<Self>;
}
