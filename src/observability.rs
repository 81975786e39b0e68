use biometrics::{Collector, Counter, Moments};

pub(crate) static ASK_REQUESTS: Counter = Counter::new("concierge.ask.requests");
pub(crate) static ASK_ERRORS: Counter = Counter::new("concierge.ask.errors");
pub(crate) static ASK_DURATION: Moments = Moments::new("concierge.ask.duration_seconds");
pub(crate) static ASK_ESCALATIONS: Counter = Counter::new("concierge.ask.escalations");

pub(crate) static UPLOAD_REQUESTS: Counter = Counter::new("concierge.upload.requests");
pub(crate) static UPLOAD_ERRORS: Counter = Counter::new("concierge.upload.errors");

pub(crate) static STREAM_CONNECTS: Counter = Counter::new("concierge.stream.connects");
pub(crate) static STREAM_CONNECTS_SUPPRESSED: Counter =
    Counter::new("concierge.stream.connects_suppressed");
pub(crate) static STREAM_FRAMES_IN: Counter = Counter::new("concierge.stream.frames_in");
pub(crate) static STREAM_FRAMES_OUT: Counter = Counter::new("concierge.stream.frames_out");
pub(crate) static STREAM_SEND_ERRORS: Counter = Counter::new("concierge.stream.send_errors");
pub(crate) static STREAM_NORMAL_CLOSES: Counter = Counter::new("concierge.stream.normal_closes");
pub(crate) static STREAM_ABNORMAL_CLOSES: Counter =
    Counter::new("concierge.stream.abnormal_closes");

pub(crate) static TIMELINE_APPENDS: Counter = Counter::new("concierge.timeline.appends");
pub(crate) static SOURCES_EXTRACTED: Counter = Counter::new("concierge.sources.extracted");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&ASK_REQUESTS);
    collector.register_counter(&ASK_ERRORS);
    collector.register_moments(&ASK_DURATION);
    collector.register_counter(&ASK_ESCALATIONS);

    collector.register_counter(&UPLOAD_REQUESTS);
    collector.register_counter(&UPLOAD_ERRORS);

    collector.register_counter(&STREAM_CONNECTS);
    collector.register_counter(&STREAM_CONNECTS_SUPPRESSED);
    collector.register_counter(&STREAM_FRAMES_IN);
    collector.register_counter(&STREAM_FRAMES_OUT);
    collector.register_counter(&STREAM_SEND_ERRORS);
    collector.register_counter(&STREAM_NORMAL_CLOSES);
    collector.register_counter(&STREAM_ABNORMAL_CLOSES);

    collector.register_counter(&TIMELINE_APPENDS);
    collector.register_counter(&SOURCES_EXTRACTED);
}
