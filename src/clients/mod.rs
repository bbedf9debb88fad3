pub mod jobseek;
pub mod resend;
