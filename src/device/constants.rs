use uuid::{uuid, Uuid};

/**
 * How long (milliseconds) to scan for advertising devices before picking one.
 */
pub const SCAN_DURATION: u64 = 3000;

/**
 * How long (milliseconds) a connection attempt may take before it counts as failed.
 */
pub const CONNECT_DEADLINE: u64 = 10000;

/**
 * How often (milliseconds) to check whether the connected device is still connected.
 */
pub const CONNECTION_CHECK_INTERVAL: u64 = 2000;

/**
 * How long (milliseconds) checking if the peripheral is still connected may take
 */
pub const IS_CONNECTED_DEADLINE: u64 = 2000;

/**
 * The Bluetooth SIG Heart Rate service, advertised by most wrist-worn wearables.
 */
pub const HEART_RATE_SERVICE: Uuid = uuid!("0000180d-0000-1000-8000-00805f9b34fb");
