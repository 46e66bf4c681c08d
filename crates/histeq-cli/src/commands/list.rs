use histeq_core::compute::list_platforms_devices;

/// Print every platform and device. The run continues afterwards.
pub fn run() {
    println!("{}", list_platforms_devices());
}
