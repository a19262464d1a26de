//! Hosted record store (Supabase / PostgREST).

mod supabase;

pub use supabase::{
    StoreError, SupabaseStore, ATTENDANCE_VIEW, DEFAULT_PAGE_SIZE, STUDENTS_TABLE,
    SUPABASE_KEY_ENV, SUPABASE_URL_ENV,
};
