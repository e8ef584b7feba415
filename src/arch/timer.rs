use super::hart::Hart;

/// Arm the first timer interrupt on this hart.
pub fn init_timer<H: Hart + ?Sized>(hart: &H, interval: u64) {
    arm_next(hart, interval);
}

// Re-arm; writing stimecmp also clears the pending interrupt
pub fn arm_next<H: Hart + ?Sized>(hart: &H, interval: u64) {
    let now = hart.time();
    hart.set_timecmp(now.wrapping_add(interval));
}
