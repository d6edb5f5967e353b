use crate::config::AcquisitionSettings;
use crate::errors::{ImuError, ImuResult};
use crate::messages::ImuMessage;
use crate::sensors::ImuDriver;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, trace, warn};

/// Counters reported when the loop ends
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub cycles: u64,
    pub samples: u64,
    pub failures: u64,
}

/// Reads the IMU once per control cycle and hands each sample to `consumer`.
///
/// Failed reads are reported and skipped, never replaced by a previous sample.
/// After `max_consecutive_failures` failures in a row the loop stops with
/// [`ImuError::FailsafeTriggered`] so a supervisor can take over.
pub async fn run_acquisition<D, F>(
    imu: &mut D,
    settings: &AcquisitionSettings,
    mut consumer: F,
) -> ImuResult<AcquisitionStats>
where
    D: ImuDriver,
    F: FnMut(ImuMessage),
{
    let mut ticker = interval(settings.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stats = AcquisitionStats::default();
    let mut consecutive = 0u32;
    info!(
        "[acquisition] reading {} ({}) at {}Hz",
        imu.id(),
        D::VARIANT,
        settings.rate_hz
    );

    while settings.cycles == 0 || stats.cycles < settings.cycles {
        ticker.tick().await;
        stats.cycles += 1;

        match imu.read().await {
            Ok(sample) => {
                consecutive = 0;
                stats.samples += 1;
                let msg = ImuMessage::from_sample(
                    &settings.device_id,
                    imu.id(),
                    D::VARIANT,
                    stats.samples,
                    &sample,
                );
                trace!("[acquisition] seq={} {:?}", stats.samples, sample);
                consumer(msg);
            }
            Err(e) => {
                consecutive += 1;
                stats.failures += 1;
                warn!(
                    "[acquisition] {} read failed ({}/{}): {}",
                    imu.id(),
                    consecutive,
                    settings.max_consecutive_failures,
                    e
                );
                if consecutive >= settings.max_consecutive_failures {
                    error!("[acquisition] {} failsafe triggered", imu.id());
                    return Err(ImuError::FailsafeTriggered {
                        sensor: imu.id().to_string(),
                        consecutive,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    info!(
        "[acquisition] finished: {} cycles, {} samples, {} failures",
        stats.cycles, stats.samples, stats.failures
    );
    Ok(stats)
}
