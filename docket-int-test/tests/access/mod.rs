mod batch_write_test;
mod crud_test;
mod fault_test;
mod subscription_test;
mod tracked_document_test;
