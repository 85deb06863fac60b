use crate::{
    products::progress::{Progress, SweepReport},
    *,
};
use actix::prelude::*;


/// Receives progress records of evaluated sites
pub trait ProgressSink: Send + Sync {
    /// Report single progress record. Must not block the caller.
    fn report(&self, progress: Progress);
}


/// Reporter actor prints per-site progress lines to stdout
#[derive(Debug, Default)]
pub struct Reporter {
    report: SweepReport,
}


/// Progress of one evaluated site
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Report(pub Progress);


/// Drains the mailbox. Returns counters of everything reported so far.
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "SweepReport")]
pub struct Flush;


impl Handler<Report> for Reporter {
    type Result = ();

    fn handle(&mut self, report: Report, _ctx: &mut Self::Context) -> Self::Result {
        let progress = report.0;
        println!("{}", progress.line());
        match &progress.error {
            Some(error) if progress.unsaved => error!("{}: {}", progress.domain, error),
            Some(error) => debug!("{}: {}", progress.domain, error),
            None => trace!("Progress: {}", progress),
        }
        self.report = self.report.account(&progress);
    }
}


impl Handler<Flush> for Reporter {
    type Result = MessageResult<Flush>;

    fn handle(&mut self, _flush: Flush, _ctx: &mut Self::Context) -> Self::Result {
        debug!("Reporter flushed after {} reports", self.report.evaluated);
        MessageResult(self.report)
    }
}


impl Actor for Reporter {
    type Context = SyncContext<Self>;
}


impl ProgressSink for Addr<Reporter> {
    fn report(&self, progress: Progress) {
        self.do_send(Report(progress));
    }
}
