mod crud_test;
mod join_test;
mod put_test;
