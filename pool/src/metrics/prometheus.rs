use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder};
use prometheus::core::Collector;
use std::sync::OnceLock;

static JOBS_PUBLISHED: OnceLock<IntCounter> = OnceLock::new();
static CLEAN_JOBS: OnceLock<IntCounter> = OnceLock::new();
static JOBS_MARKED_STALE: OnceLock<IntCounter> = OnceLock::new();
static JOBS_EVICTED: OnceLock<IntCounter> = OnceLock::new();
static JOB_BROADCASTS: OnceLock<IntCounter> = OnceLock::new();
static MALFORMED_TEMPLATES: OnceLock<IntCounter> = OnceLock::new();

static SHARES: OnceLock<IntCounterVec> = OnceLock::new();
static STALE_SHARES: OnceLock<IntCounter> = OnceLock::new();
static HIGH_DIFF_SHARES: OnceLock<IntCounter> = OnceLock::new();
static SOLVED_PUBLISHED: OnceLock<IntCounter> = OnceLock::new();
static PUBLISH_FAILURES: OnceLock<IntCounter> = OnceLock::new();

static SESSIONS_CREATED: OnceLock<IntCounter> = OnceLock::new();
static SESSION_CREATE_ERRORS: OnceLock<IntCounter> = OnceLock::new();

static JOB_HEIGHT: OnceLock<IntGauge> = OnceLock::new();
static JOB_TABLE_SIZE: OnceLock<IntGauge> = OnceLock::new();

fn jobs_published() -> &'static IntCounter {
    JOBS_PUBLISHED.get_or_init(|| IntCounter::new("jobs_published_total", "Total jobs published").unwrap())
}

fn clean_jobs() -> &'static IntCounter {
    CLEAN_JOBS.get_or_init(|| {
        IntCounter::new("clean_jobs_total", "Jobs published for a new height").unwrap()
    })
}

fn jobs_marked_stale() -> &'static IntCounter {
    JOBS_MARKED_STALE.get_or_init(|| {
        IntCounter::new("jobs_marked_stale_total", "Job handles flipped to stale").unwrap()
    })
}

fn jobs_evicted() -> &'static IntCounter {
    JOBS_EVICTED.get_or_init(|| {
        IntCounter::new("jobs_evicted_total", "Jobs dropped from the job table").unwrap()
    })
}

fn job_broadcasts() -> &'static IntCounter {
    JOB_BROADCASTS.get_or_init(|| {
        IntCounter::new("job_broadcasts_total", "Job notifications sent to sessions").unwrap()
    })
}

fn malformed_templates() -> &'static IntCounter {
    MALFORMED_TEMPLATES.get_or_init(|| {
        IntCounter::new(
            "malformed_templates_total",
            "Template notifications dropped as unparseable",
        )
        .unwrap()
    })
}

fn shares() -> &'static IntCounterVec {
    SHARES.get_or_init(|| {
        IntCounterVec::new(
            Opts::new("shares_total", "Shares graded, by verdict"),
            &["status"],
        ).unwrap()
    })
}

fn stale_shares() -> &'static IntCounter {
    STALE_SHARES.get_or_init(|| {
        IntCounter::new("stale_shares_total", "Shares submitted against stale jobs").unwrap()
    })
}

fn high_diff_shares() -> &'static IntCounter {
    HIGH_DIFF_SHARES.get_or_init(|| {
        IntCounter::new(
            "high_diff_shares_total",
            "Shares far above network difficulty",
        )
        .unwrap()
    })
}

fn solved_published() -> &'static IntCounter {
    SOLVED_PUBLISHED.get_or_init(|| {
        IntCounter::new("solved_shares_published_total", "Solved shares handed to the result channel").unwrap()
    })
}

fn publish_failures() -> &'static IntCounter {
    PUBLISH_FAILURES.get_or_init(|| {
        IntCounter::new(
            "solved_share_publish_failures_total",
            "Solved shares the result channel refused",
        )
        .unwrap()
    })
}

fn sessions_created() -> &'static IntCounter {
    SESSIONS_CREATED.get_or_init(|| IntCounter::new("sessions_created_total", "Sessions created").unwrap())
}

fn session_create_errors() -> &'static IntCounter {
    SESSION_CREATE_ERRORS.get_or_init(|| {
        IntCounter::new("session_create_errors_total", "Connections dropped at session creation").unwrap()
    })
}

fn job_height() -> &'static IntGauge {
    JOB_HEIGHT.get_or_init(|| IntGauge::new("job_height", "Height of the current job").unwrap())
}

fn job_table_size() -> &'static IntGauge {
    JOB_TABLE_SIZE.get_or_init(|| IntGauge::new("job_table_size", "Jobs resolvable for share checks").unwrap())
}

pub fn inc_jobs_published() {
    jobs_published().inc();
}

pub fn inc_clean_jobs() {
    clean_jobs().inc();
}

pub fn inc_jobs_marked_stale_by(n: u64) {
    jobs_marked_stale().inc_by(n);
}

pub fn inc_jobs_evicted_by(n: u64) {
    jobs_evicted().inc_by(n);
}

pub fn inc_job_broadcasts() {
    job_broadcasts().inc();
}

pub fn inc_malformed_templates() {
    malformed_templates().inc();
}

pub fn inc_share(status: &str) {
    shares().with_label_values(&[status]).inc();
}

pub fn inc_stale_shares() {
    stale_shares().inc();
}

pub fn inc_high_diff_shares() {
    high_diff_shares().inc();
}

pub fn inc_solved_published() {
    solved_published().inc();
}

pub fn inc_publish_failures() {
    publish_failures().inc();
}

pub fn inc_sessions_created() {
    sessions_created().inc();
}

pub fn inc_session_create_errors() {
    session_create_errors().inc();
}

pub fn set_job_height(height: u64) {
    job_height().set(height as i64);
}

pub fn set_job_table_size(size: usize) {
    job_table_size().set(size as i64);
}

pub fn render() -> String {
    let enc = TextEncoder::new();
    let mut mfs = Vec::new();

    mfs.extend(jobs_published().collect());
    mfs.extend(clean_jobs().collect());
    mfs.extend(jobs_marked_stale().collect());
    mfs.extend(jobs_evicted().collect());
    mfs.extend(job_broadcasts().collect());
    mfs.extend(malformed_templates().collect());
    mfs.extend(shares().collect());
    mfs.extend(stale_shares().collect());
    mfs.extend(high_diff_shares().collect());
    mfs.extend(solved_published().collect());
    mfs.extend(publish_failures().collect());
    mfs.extend(sessions_created().collect());
    mfs.extend(session_create_errors().collect());
    mfs.extend(job_height().collect());
    mfs.extend(job_table_size().collect());

    let mut buf = Vec::new();
    let _ = enc.encode(&mfs, &mut buf);
    String::from_utf8_lossy(&buf).to_string()
}
