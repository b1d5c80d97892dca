pub mod user_repo;
pub use user_repo::UserRepository;
pub mod church_repo;
pub use church_repo::ChurchRepository;
pub mod member_repo;
pub use member_repo::MemberRepository;
