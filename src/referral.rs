use rand::Rng;

pub const REFERRAL_CODE_LEN: usize = 8;
pub const REFERRAL_BONUS_THRESHOLD: i64 = 10;
pub const REFERRAL_BONUS_MONTHS: u32 = 3;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_referral_code() -> String {
    generate_code_with(&mut rand::thread_rng())
}

fn generate_code_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..REFERRAL_CODE_LEN)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Процент пути к бонусу, не больше 100.
pub fn bonus_progress(subscribed: i64) -> f64 {
    let progress = subscribed as f64 * 100.0 / REFERRAL_BONUS_THRESHOLD as f64;
    progress.min(100.0)
}

pub fn bonus_due(pending_subscribed: i64) -> bool {
    pending_subscribed >= REFERRAL_BONUS_THRESHOLD
}
